use clap::Parser;
use exam_core::model::{ExamSetId, Part, PassageId, Question, QuestionId};
use storage::repository::Storage;

/// Seed a TOEIC question bank for local practice sessions.
#[derive(Debug, Parser)]
#[command(name = "seed", about = "Seed sample TOEIC questions into SQLite")]
struct Args {
    /// SQLite URL
    #[arg(long = "db", env = "TOEIC_DB_URL", default_value = "sqlite:toeic.sqlite3?mode=rwc")]
    db_url: String,

    /// Exam set the seeded questions belong to
    #[arg(long, env = "TOEIC_EXAM_SET", default_value_t = 1)]
    exam_set: u64,

    /// Questions generated for each of the seven parts
    #[arg(long, default_value_t = 6)]
    per_part: u32,
}

/// Passage groups span three questions in parts 3, 4, 6 and 7.
const GROUP_SIZE: u32 = 3;

fn choices_for(part: Part) -> Vec<String> {
    // Part 2 (question-response) offers three options.
    let labels: &[&str] = if part.number() == 2 {
        &["A", "B", "C"]
    } else {
        &["A", "B", "C", "D"]
    };
    labels.iter().map(|l| (*l).to_owned()).collect()
}

fn has_passages(part: Part) -> bool {
    matches!(part.number(), 3 | 4 | 6 | 7)
}

fn build_question(
    id: u64,
    part: Part,
    index: u32,
) -> Result<Question, exam_core::Error> {
    let choices = choices_for(part);
    let correct = choices[(index as usize) % choices.len()].clone();
    let passage = has_passages(part)
        .then(|| PassageId::new(format!("p{}-g{}", part.number(), index / GROUP_SIZE + 1)));
    let prompt = format!("{part}, question {}", index + 1);
    Ok(Question::new(
        QuestionId::new(id),
        part,
        prompt,
        choices,
        correct,
        passage,
    )?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::sqlite(&args.db_url).await?;
    let exam_set = ExamSetId::new(args.exam_set);

    let mut next_id = 1u64;
    for part in Part::all() {
        for index in 0..args.per_part {
            let question = build_question(next_id, part, index)?;
            storage
                .questions
                .upsert_question(Some(exam_set), &question)
                .await?;
            next_id += 1;
        }
    }

    println!(
        "Seeded {} questions into exam set {} at {}",
        next_id - 1,
        exam_set,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
