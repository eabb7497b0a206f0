// Property tests: arbitrary command sequences never leave the phase graph.

use std::time::Duration;

use proptest::prelude::*;

use redlight::{Direction, Game, Phase, Rules, Signal};

#[derive(Debug, Clone)]
enum Command {
    Start,
    Reset,
    Advance(u64),
    Press(Direction),
    Release(Direction),
    ForceRed,
    ForceGreen,
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Forward),
        Just(Direction::Back),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        1 => Just(Command::Start),
        1 => Just(Command::Reset),
        6 => (1u64..200).prop_map(Command::Advance),
        2 => direction().prop_map(Command::Press),
        2 => direction().prop_map(Command::Release),
        1 => Just(Command::ForceRed),
        1 => Just(Command::ForceGreen),
    ]
}

fn apply(game: &mut Game, cmd: &Command) {
    match cmd {
        Command::Start => game.start(),
        Command::Reset => game.reset(),
        Command::Advance(ms) => game.advance(Duration::from_millis(*ms)),
        Command::Press(d) => game.report_input_direction(*d, true),
        Command::Release(d) => game.report_input_direction(*d, false),
        Command::ForceRed => {
            game.force_signal(Signal::Red);
        }
        Command::ForceGreen => {
            game.force_signal(Signal::Green);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn phase_moves_only_along_graph(seed in any::<u64>(), cmds in prop::collection::vec(command(), 1..300)) {
        let mut game = Game::new(Rules { seed: Some(seed), ..Rules::default() });

        for cmd in &cmds {
            let before = game.phase();
            apply(&mut game, cmd);
            let after = game.phase();

            let allowed = match cmd {
                Command::Start => after == Phase::Countdown,
                Command::Reset => after == Phase::Waiting,
                _ => before == after || before.can_advance_to(after),
            };
            prop_assert!(allowed, "{:?}: {} -> {}", cmd, before, after);
        }
    }

    #[test]
    fn session_fields_stay_in_range(seed in any::<u64>(), cmds in prop::collection::vec(command(), 1..300)) {
        let mut game = Game::new(Rules { seed: Some(seed), ..Rules::default() });

        for cmd in &cmds {
            apply(&mut game, cmd);
            let snap = game.snapshot();

            prop_assert!((0.0..=1.0).contains(&snap.progress));
            prop_assert!(snap.countdown <= 3);
            prop_assert!(snap.time_remaining <= 60);
            prop_assert!((-10.0..=10.0).contains(&snap.lateral_position));
            prop_assert!((-5.0..=25.0).contains(&snap.longitudinal_position));
            if snap.phase == Phase::Playing {
                prop_assert!(snap.progress < 1.0);
                prop_assert!(snap.time_remaining > 0);
            }
            if snap.phase == Phase::Countdown {
                prop_assert_eq!(snap.signal, Signal::Green);
            }
        }
    }
}

#[test]
fn start_always_yields_fresh_round() {
    let mut game = Game::new(Rules {
        seed: Some(3),
        ..Rules::default()
    });
    for phase_driver in 0..4u64 {
        game.start();
        game.advance(Duration::from_millis(phase_driver * 1500));
        game.report_input_direction(Direction::Forward, true);
        game.advance(Duration::from_millis(250));

        game.start();
        assert_eq!(game.phase(), Phase::Countdown);
        assert_eq!(game.countdown(), 3);
        assert_eq!(game.time_remaining(), 60);
        assert_eq!(game.progress(), 0.0);
        assert_eq!(game.signal(), Signal::Green);
    }
}
