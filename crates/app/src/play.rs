//! Terminal driver for one exercise session.

use std::time::Duration;

use practice_core::level::Direction;
use practice_core::model::{AttemptStatus, ModuleKey, OperationKind, RewardType};
use rand::rngs::StdRng;
use services::{
    AdvanceOutcome, AppServices, AttemptOutcome, EngineEvent, ExerciseSession, SessionError,
    SessionPhase, SessionReport, SubmitOutcome, TickOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "\
  <number>   submit an answer
  d <number> stage an answer (checked if time runs out)
  r          reveal the answer
  <enter>    continue
  p / n      previous / next problem
  b          back to the current problem
  c          cancel the automatic advance
  q          quit";

enum Flow {
    Continue,
    Quit,
}

pub async fn play(
    services: &AppServices,
    key: ModuleKey,
    operation: OperationKind,
    rng: StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let hub = services.notifications();
    let mut events = hub.subscribe();
    let exercise_loop = services.exercise_loop();
    let mut session = exercise_loop.start_session(key, operation, rng).await?;
    session.start()?;

    println!("{HELP}\n");
    show_problem(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    let mut events_open = true;

    while !session.is_complete() {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = session.tick().await?;
                on_tick(&session, &outcome);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match on_line(&mut session, line.trim()).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(err) => println!("  {err}"),
                }
            }
            event = events.recv(), if events_open => match event {
                Ok(event) => on_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "notification receiver lagged");
                }
                Err(RecvError::Closed) => events_open = false,
            },
        }
    }

    drain_events(&mut events);

    if session.is_complete() {
        let report = exercise_loop.finish(&mut session).await?;
        show_report(&report);
    } else {
        session.flush().await?;
        println!("Session left unfinished.");
    }
    Ok(())
}

async fn on_line(session: &mut ExerciseSession, line: &str) -> Result<Flow, SessionError> {
    match line {
        "q" => return Ok(Flow::Quit),
        "h" | "?" => println!("{HELP}"),
        "r" => {
            if let SubmitOutcome::Evaluated(outcome) = session.reveal().await? {
                show_outcome(session, &outcome);
                show_waiting(session);
            }
        }
        "p" => {
            if session.view_previous() {
                show_problem(session);
            }
        }
        "n" => {
            if session.view_next() {
                show_problem(session);
            }
        }
        "b" => {
            if session.return_to_active() {
                show_problem(session);
            }
        }
        "c" => {
            if session.cancel_auto_advance() {
                println!("  Automatic advance cancelled. Press enter to continue.");
            }
        }
        "" => match session.phase() {
            SessionPhase::LevelUpPause => {
                session.acknowledge_level_up()?;
                show_problem(session);
            }
            SessionPhase::WaitingToAdvance => {
                let outcome = session.advance().await?;
                on_advance(session, &outcome);
            }
            _ => {}
        },
        other => {
            if let Some(staged) = other.strip_prefix("d ") {
                match staged.trim().parse::<f64>() {
                    Ok(value) if session.update_draft(Some(value)) => {
                        println!("  Staged {value}.");
                    }
                    Ok(_) => {}
                    Err(_) => println!("  Not a number: {staged}"),
                }
                return Ok(Flow::Continue);
            }
            match other.parse::<f64>() {
                Ok(answer) => match session.submit_answer(answer).await? {
                    SubmitOutcome::Evaluated(outcome) => {
                        show_outcome(session, &outcome);
                        show_waiting(session);
                    }
                    SubmitOutcome::Ignored => show_waiting(session),
                },
                Err(_) => println!("  Unknown input, h for help."),
            }
        }
    }
    Ok(Flow::Continue)
}

fn on_tick(session: &ExerciseSession, outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Idle => {
            let state = session.state();
            if let Some(remaining) = state.remaining_secs
                && state.phase == SessionPhase::Active
                && (1..=5).contains(&remaining)
            {
                println!("  {remaining}s left");
            }
        }
        TickOutcome::Expired(outcome) => {
            println!("  Time is up.");
            show_outcome(session, outcome);
            show_waiting(session);
        }
        TickOutcome::AutoAdvanced(advance) => on_advance(session, advance),
    }
}

fn on_advance(session: &ExerciseSession, outcome: &AdvanceOutcome) {
    match outcome {
        AdvanceOutcome::Next { .. } => show_problem(session),
        AdvanceOutcome::Extended { added, .. } => {
            println!("  {added} extra problem(s) added.");
            show_problem(session);
        }
        AdvanceOutcome::Completed(_) => {}
    }
}

fn on_event(event: &EngineEvent) {
    match event {
        EngineEvent::LevelChanged { change, .. } => match change.direction {
            Direction::Up => println!("  Level up! Now {}.", change.new),
            Direction::Down => println!("  Level changed to {}.", change.new),
        },
        EngineEvent::RewardGranted { reward, .. } => {
            println!("  New reward: {} ({})", reward.name, reward.description);
        }
        _ => {}
    }
}

fn drain_events(events: &mut broadcast::Receiver<EngineEvent>) {
    while let Ok(event) = events.try_recv() {
        on_event(&event);
    }
}

fn show_problem(session: &ExerciseSession) {
    let state = session.state();
    let problem = &state.displayed_problem;
    let operands = problem.formatted_operands();
    let symbol = format!(" {} ", problem.operation().symbol());
    let history = if state.is_viewing_history() {
        " (history)"
    } else {
        ""
    };
    println!(
        "\nProblem {}/{} [{}]{history}",
        state.displayed_index + 1,
        state.total_problems,
        state.level
    );
    match &state.displayed_record {
        Some(record) if record.status.is_final() => {
            println!(
                "  {} = {}  ({})",
                operands.join(&symbol),
                problem.canonical_answer(),
                status_label(record.status)
            );
        }
        _ => {
            let timer = state
                .remaining_secs
                .map(|secs| format!("  [{secs}s]"))
                .unwrap_or_default();
            println!("  {} = ?{timer}", operands.join(&symbol));
        }
    }
}

fn show_outcome(session: &ExerciseSession, outcome: &AttemptOutcome) {
    let answer = session.active_problem().canonical_answer();
    match outcome.status {
        AttemptStatus::Correct => println!("  Correct!"),
        AttemptStatus::Incorrect => match outcome.attempts_left {
            Some(left) => println!("  Not quite, {left} attempt(s) left."),
            None => println!("  Not quite, try again."),
        },
        AttemptStatus::Revealed => println!("  The answer is {answer}."),
        AttemptStatus::TimedOut => match outcome.attempts_left {
            Some(left) => println!("  No answer given, {left} attempt(s) left."),
            None => println!("  No answer given, try again."),
        },
    }
    if let Some(draw) = outcome.reward
        && let Some(featured) = draw.featured
    {
        let prize = prize_label(session.settings().reward_type());
        println!("  {prize} {}!", featured.name);
    }
    if !outcome.persisted {
        println!("  Progress not saved yet, it will be retried.");
    }
}

fn prize_label(kind: RewardType) -> &'static str {
    match kind {
        RewardType::Stars => "* A star for you:",
        RewardType::Medals => "(o) A medal for you:",
        RewardType::Trophies => "[T] A trophy for you:",
    }
}

fn show_waiting(session: &ExerciseSession) {
    let state = session.state();
    match state.phase {
        SessionPhase::LevelUpPause => println!("  Press enter to continue at the new level."),
        SessionPhase::WaitingToAdvance => match state.auto_advance_in {
            Some(secs) => println!("  Next problem in {secs}s (enter to go now, c to stay)."),
            None => println!("  Press enter for the next problem."),
        },
        _ => {}
    }
}

fn show_report(report: &SessionReport) {
    let summary = &report.summary;
    println!(
        "\nDone! {}/{} correct ({:.0}%) in {}s at {} level.",
        summary.score(),
        summary.total_problems(),
        summary.percent(),
        summary.time_spent_secs(),
        summary.difficulty()
    );
    if !report.persisted {
        println!("  Results could not be saved.");
    }
    for reward in &report.rewards {
        println!("  Earned: {}", reward.name);
    }
}

fn status_label(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Correct => "correct",
        AttemptStatus::Incorrect => "incorrect",
        AttemptStatus::Revealed => "revealed",
        AttemptStatus::TimedOut => "timed out",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_reward_type_has_its_own_label() {
        let labels = [
            prize_label(RewardType::Stars),
            prize_label(RewardType::Medals),
            prize_label(RewardType::Trophies),
        ];

        assert!(labels[0].contains("star"));
        assert!(labels[1].contains("medal"));
        assert!(labels[2].contains("trophy"));
    }
}
