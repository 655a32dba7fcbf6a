//! Line commands and plain-text rendering for the terminal shell.

use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

use exam_core::model::{ScoreResult, Submission};
use services::{ResultListItem, SessionSnapshot};

pub const HELP: &str = "\
commands:
  a <choice>   answer the current question
  c            clear the current answer
  n / p        next / previous question
  g <number>   go to question <number>
  f            flag or unflag the current question
  s            show the current question again
  pause        pause the countdown
  resume       resume the countdown
  submit       submit the exam
  q            quit without submitting";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Answer(String),
    Clear,
    Next,
    Previous,
    GoTo(usize),
    Flag,
    Show,
    Pause,
    Resume,
    Submit,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("question numbers start at 1, got `{0}`")]
    InvalidNumber(String),
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),
}

impl FromStr for ShellCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(h, r)| (h, r.trim()));

        match head.to_ascii_lowercase().as_str() {
            "" => Err(ParseCommandError::Empty),
            "a" | "answer" => {
                if rest.is_empty() {
                    Err(ParseCommandError::MissingArgument("a"))
                } else {
                    Ok(ShellCommand::Answer(rest.to_owned()))
                }
            }
            "c" | "clear" => Ok(ShellCommand::Clear),
            "n" | "next" => Ok(ShellCommand::Next),
            "p" | "prev" | "previous" => Ok(ShellCommand::Previous),
            "g" | "go" => {
                if rest.is_empty() {
                    return Err(ParseCommandError::MissingArgument("g"));
                }
                rest.parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .map(ShellCommand::GoTo)
                    .ok_or_else(|| ParseCommandError::InvalidNumber(rest.to_owned()))
            }
            "f" | "flag" => Ok(ShellCommand::Flag),
            "s" | "show" => Ok(ShellCommand::Show),
            "pause" => Ok(ShellCommand::Pause),
            "resume" => Ok(ShellCommand::Resume),
            "submit" => Ok(ShellCommand::Submit),
            "h" | "help" | "?" => Ok(ShellCommand::Help),
            "q" | "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(ParseCommandError::Unknown(other.to_owned())),
        }
    }
}

#[must_use]
pub fn render_question(snapshot: &SessionSnapshot) -> String {
    let question = &snapshot.current_question;
    let mut out = String::new();
    let flag = if snapshot.is_flagged(question.id()) {
        "  [flagged]"
    } else {
        ""
    };
    let _ = writeln!(
        out,
        "Question {}/{}  {}  time {}  answered {}/{}{}",
        snapshot.current_index + 1,
        snapshot.total_questions,
        question.part(),
        snapshot.time_left,
        snapshot.answered_count,
        snapshot.total_questions,
        flag,
    );
    let _ = writeln!(out, "{}", question.prompt());
    for choice in question.choices() {
        let marker = if snapshot.selected_choice.as_deref() == Some(choice.as_str()) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, " {marker} {choice}");
    }
    out
}

fn format_seconds(seconds: u64) -> String {
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

#[must_use]
pub fn render_score(score: &ScoreResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Score {}%  ({} correct, {} incorrect, {} answered of {})  time {}",
        score.score_percent,
        score.correct_count,
        score.incorrect_count(),
        score.answered_count,
        score.total_questions,
        format_seconds(score.time_spent_seconds),
    );
    for (part, breakdown) in &score.per_part {
        let _ = writeln!(
            out,
            "  {part}: {}/{} ({}%)",
            breakdown.correct, breakdown.total, breakdown.accuracy
        );
    }
    out
}

#[must_use]
pub fn render_submission(submission: &Submission) -> String {
    format!(
        "Session {} ended: {}\n{}",
        submission.session_id(),
        submission.termination().as_str(),
        render_score(submission.score())
    )
}

#[must_use]
pub fn render_history(items: &[ResultListItem]) -> String {
    if items.is_empty() {
        return "No results yet.\n".to_owned();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "#{:<4} {}  {:>3}%  {}/{}  {}  {}",
            item.id,
            item.submitted_at.format("%Y-%m-%d %H:%M"),
            item.score_percent,
            item.correct,
            item.total,
            format_seconds(item.time_spent_seconds),
            item.termination.as_str(),
        );
    }
    out
}
