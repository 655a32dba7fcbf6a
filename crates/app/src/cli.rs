use clap::{Args, Parser, Subcommand};

use exam_core::model::{ExamConfigError, ExamConfiguration, ExamSetId};

pub const DEFAULT_DB_URL: &str = "sqlite:toeic.sqlite3?mode=rwc";

#[derive(Debug, Parser)]
#[command(name = "toeic", version, about = "Timed TOEIC practice exams in the terminal")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// SQLite URL of the question bank and result store
    #[arg(long = "db", env = "TOEIC_DB_URL", default_value = DEFAULT_DB_URL, global = true)]
    pub db_url: String,

    #[command(flatten)]
    pub exam: ExamArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List recent results
    History {
        /// Number of results to show
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ExamArgs {
    /// Exam set to draw questions from; the whole bank when omitted
    #[arg(long, env = "TOEIC_EXAM_SET")]
    pub exam_set: Option<u64>,

    /// Parts to include, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [1u8, 2, 3, 4, 5, 6, 7])]
    pub parts: Vec<u8>,

    /// Number of questions
    #[arg(long, default_value_t = 20)]
    pub count: u32,

    /// Time limit in minutes
    #[arg(long, default_value_t = 15)]
    pub minutes: u32,

    /// Run without a time limit
    #[arg(long)]
    pub unlimited: bool,

    /// Shuffle passage groups within each part
    #[arg(long)]
    pub shuffle: bool,
}

impl ExamArgs {
    /// # Errors
    ///
    /// Returns `ExamConfigError` when the flags describe an invalid exam.
    pub fn to_config(&self) -> Result<ExamConfiguration, ExamConfigError> {
        let parts = self.parts.iter().copied();
        let config = if self.unlimited {
            ExamConfiguration::unlimited(parts, self.count)?
        } else {
            ExamConfiguration::standard(parts, self.count, self.minutes)?
        };
        Ok(match self.exam_set {
            Some(id) => config.with_exam_set(ExamSetId::new(id)),
            None => config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::TimeMode;

    #[test]
    fn exam_flags_build_a_configuration() {
        let cli = Cli::parse_from([
            "toeic", "--parts", "5,7", "--count", "8", "--minutes", "12", "--exam-set", "3",
        ]);
        assert!(cli.command.is_none());
        let config = cli.exam.to_config().unwrap();
        assert_eq!(config.question_count(), 8);
        assert_eq!(config.time_limit_seconds(), Some(720));
        assert_eq!(config.selected_parts().len(), 2);
        assert_eq!(config.exam_set_id(), Some(ExamSetId::new(3)));
    }

    #[test]
    fn unlimited_flag_selects_untimed_mode() {
        let cli = Cli::parse_from(["toeic", "--unlimited", "--parts", "6"]);
        let config = cli.exam.to_config().unwrap();
        assert_eq!(config.time_mode(), TimeMode::Unlimited);
        assert_eq!(config.time_limit_seconds(), None);
    }

    #[test]
    fn history_subcommand_parses() {
        let cli = Cli::parse_from(["toeic", "history", "--limit", "3"]);
        assert!(matches!(cli.command, Some(Command::History { limit: 3 })));
    }

    #[test]
    fn invalid_part_is_rejected() {
        let args = ExamArgs {
            exam_set: None,
            parts: vec![8],
            count: 5,
            minutes: 5,
            unlimited: false,
            shuffle: false,
        };
        assert!(matches!(
            args.to_config(),
            Err(ExamConfigError::InvalidPart(_))
        ));
    }
}
