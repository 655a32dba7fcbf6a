use anyhow::Context;
use clap::Parser;
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use exam_core::model::{QuestionId, SessionStatus};
use services::{
    Clock, ExamServices, ExamSession, ExamSessionService, IntervalTicks, RetryPolicy,
    SessionError, SessionTick,
};

mod cli;
mod shell;

use cli::{Cli, Command, ExamArgs};
use shell::{HELP, ShellCommand};

type Input = Lines<BufReader<Stdin>>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("services=info,app=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let services = ExamServices::new_sqlite(&cli.db_url, Clock::default_clock(), cli.exam.shuffle)
        .await
        .with_context(|| format!("opening {}", cli.db_url))?;

    match cli.command {
        Some(Command::History { limit }) => {
            let items = services.results().list_recent_results(limit).await?;
            print!("{}", shell::render_history(&items));
            Ok(())
        }
        None => take_exam(&services, &cli.exam).await,
    }
}

async fn take_exam(services: &ExamServices, args: &ExamArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let (ticks, mut tick_rx) = IntervalTicks::new();
    let sessions = services.sessions();
    let mut session = sessions.open_session(config, ticks).await?;

    // Redraw whenever the student lands on another question or the status changes.
    let last_seen: Mutex<Option<(usize, SessionStatus)>> = Mutex::new(None);
    session.subscribe(Box::new(move |snapshot| {
        let key = (snapshot.current_index, snapshot.status);
        let mut last = last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        if *last != Some(key) {
            *last = Some(key);
            if snapshot.status == SessionStatus::Running {
                print!("\n{}", shell::render_question(snapshot));
            }
        }
    }));

    println!("{HELP}\n");
    session.start()?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let quit = drive(&mut session, &mut tick_rx, &mut input).await?;

    if quit && !session.status().is_terminal() {
        info!(session_id = %session.id(), "session abandoned");
        session.teardown();
        println!("Exam abandoned; nothing was recorded.");
        return Ok(());
    }

    if let Some(submission) = session.submission() {
        print!("\n{}", shell::render_submission(submission));
    }
    store_result(&sessions, &mut session, &mut input).await;
    session.teardown();
    Ok(())
}

/// Serialize ticks and typed commands until the session ends. Returns true
/// when the student quit instead.
async fn drive(
    session: &mut ExamSession<IntervalTicks>,
    ticks: &mut services::TickReceiver,
    input: &mut Input,
) -> anyhow::Result<bool> {
    loop {
        tokio::select! {
            Some(()) = ticks.recv() => match session.tick() {
                SessionTick::Counting { remaining } if remaining == 60 || remaining == 10 => {
                    println!("{} left", session.time_left());
                }
                SessionTick::Expired(_) => {
                    println!("\nTime is up.");
                    return Ok(false);
                }
                _ => {}
            },
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(true);
                };
                match line.parse::<ShellCommand>() {
                    Ok(ShellCommand::Quit) => return Ok(true),
                    Ok(command) => {
                        if let Err(err) = apply(session, command) {
                            println!("! {err}");
                        }
                        if session.status().is_terminal() {
                            return Ok(false);
                        }
                    }
                    Err(shell::ParseCommandError::Empty) => {}
                    Err(err) => println!("! {err}"),
                }
            }
        }
    }
}

fn apply(
    session: &mut ExamSession<IntervalTicks>,
    command: ShellCommand,
) -> Result<(), SessionError> {
    let current: QuestionId = session.current_question().id();
    match command {
        ShellCommand::Answer(choice) => session.select_answer(current, &choice),
        ShellCommand::Clear => session.clear_answer(current),
        ShellCommand::Next => session.next(),
        ShellCommand::Previous => session.previous(),
        ShellCommand::GoTo(index) => session.go_to(index),
        ShellCommand::Flag => session.toggle_flag(current).map(|flagged| {
            println!("{}", if flagged { "flagged" } else { "unflagged" });
        }),
        ShellCommand::Show => {
            print!("{}", shell::render_question(&session.snapshot()));
            Ok(())
        }
        ShellCommand::Pause => session.pause().map(|()| {
            if session.status() == SessionStatus::Paused {
                println!("Paused at {}. Type `resume` to continue.", session.time_left());
            }
        }),
        ShellCommand::Resume => session.resume(),
        ShellCommand::Submit => session.submit().map(|_| ()),
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
    }
}

/// Persist with retries, then keep offering a manual retry while the store
/// is unavailable.
async fn store_result(
    sessions: &ExamSessionService,
    session: &mut ExamSession<IntervalTicks>,
    input: &mut Input,
) {
    let mut outcome = sessions
        .persist_with_retry(session, RetryPolicy::default())
        .await;
    loop {
        match outcome {
            Ok(id) => {
                println!("Result saved as #{id}.");
                return;
            }
            Err(err) => {
                warn!(error = %err, "result not saved");
                println!("Could not save the result: {err}\nRetry? [y/N]");
                let answer = input.next_line().await.ok().flatten().unwrap_or_default();
                if !answer.trim().eq_ignore_ascii_case("y") {
                    println!("Result discarded.");
                    return;
                }
                outcome = sessions.persist_result(session).await;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
