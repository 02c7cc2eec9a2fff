//! Interactive collection of credentials, thresholds and confirmations.
//!
//! Parsing is split from I/O: each `parse_*` function validates one answer
//! and the `Prompter` keeps asking until it gets a valid one. Empty
//! credentials and closed input are the only fatal cases.

use skyprune_core::{CoreError, Credentials, FilterCriteria, InputError};
use std::io::{BufRead, Write};

const CANCEL_WORDS: [&str; 4] = ["n", "no", "cancel", "exit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// Non-negative integer threshold.
pub fn parse_threshold(input: &str, field: &str) -> Result<u32, InputError> {
    let value: i64 = input.trim().parse().map_err(|_| InputError::NotANumber {
        input: input.trim().to_string(),
    })?;
    if value < 0 {
        return Err(InputError::Negative {
            field: field.to_string(),
        });
    }
    u32::try_from(value).map_err(|_| InputError::NotANumber {
        input: input.trim().to_string(),
    })
}

/// `[Y/n]` answer: empty means yes.
pub fn parse_yes_no(input: &str) -> Result<bool, InputError> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(InputError::NotYesNo {
            input: other.to_string(),
        }),
    }
}

/// `[y/N]` answer: only an explicit yes counts.
pub fn parse_default_no(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// The literal `DELETE` confirms; a cancel word backs out.
pub fn parse_confirmation(input: &str) -> Result<Confirmation, InputError> {
    let trimmed = input.trim();
    if trimmed == "DELETE" {
        return Ok(Confirmation::Confirmed);
    }
    if CANCEL_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        return Ok(Confirmation::Cancelled);
    }
    Err(InputError::NotConfirmation {
        input: trimmed.to_string(),
    })
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Print one line for the operator.
    pub fn say(&mut self, line: &str) -> Result<(), CoreError> {
        writeln!(self.output, "{}", line)?;
        self.output.flush()?;
        Ok(())
    }

    fn ask(&mut self, question: &str, field: &str) -> Result<String, CoreError> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputError::Closed {
                field: field.to_string(),
            }
            .into());
        }
        Ok(line.trim().to_string())
    }

    fn ask_until<T>(
        &mut self,
        question: &str,
        field: &str,
        parse: impl Fn(&str) -> Result<T, InputError>,
    ) -> Result<T, CoreError> {
        loop {
            let answer = self.ask(question, field)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!("Rejected {} input: {:?}", field, e);
                    self.say(&format!("Error: {}", e))?;
                }
            }
        }
    }

    fn ask_required(&mut self, question: &str, field: &str) -> Result<String, CoreError> {
        let answer = self.ask(question, field)?;
        if answer.is_empty() {
            let error = InputError::Empty {
                field: field.to_string(),
            };
            self.say(&format!("Error: {}", error))?;
            return Err(error.into());
        }
        Ok(answer)
    }

    pub fn ask_credentials(&mut self) -> Result<Credentials, CoreError> {
        self.say("\n=== Bluesky Authentication ===")?;
        self.say("Note: Use an app password, not your main account password!")?;
        self.say("Generate one at: https://bsky.app/settings/app-passwords\n")?;

        let identifier = self.ask_required(
            "Enter your Bluesky username (e.g., user.bsky.social): ",
            "Username",
        )?;
        let secret = self.ask_required("Enter your app password (visible): ", "Password")?;

        Ok(Credentials { identifier, secret })
    }

    /// Thresholds and flags, followed by a printed summary.
    pub fn ask_criteria(&mut self) -> Result<FilterCriteria, CoreError> {
        self.say("\n=== Deletion Parameters ===")?;

        let age_threshold_days = self.ask_until(
            "Delete posts older than how many days? (e.g., 30): ",
            "Days",
            |s| parse_threshold(s, "Days"),
        )?;

        let min_likes = self.ask_until(
            "Keep posts with at least this many likes (0 = ignore likes): ",
            "Likes",
            |s| parse_threshold(s, "Likes"),
        )?;
        if min_likes == 0 {
            self.say("  → Likes will be ignored (posts won't be protected by likes)")?;
        }

        let min_reposts = self.ask_until(
            "Keep posts with at least this many reposts (0 = ignore reposts): ",
            "Reposts",
            |s| parse_threshold(s, "Reposts"),
        )?;
        if min_reposts == 0 {
            self.say("  → Reposts will be ignored (posts won't be protected by reposts)")?;
        }

        let keep_images = self.ask_until(
            "\nKeep posts that have images? [Y/n]: ",
            "Keep images",
            parse_yes_no,
        )?;
        if keep_images {
            self.say("  → Posts with images will be kept")?;
        } else {
            self.say("  → Posts with images will NOT be protected")?;
        }

        let dry_run = self.ask_until(
            "\nDry-run mode? (preview only, no deletions) [Y/n]: ",
            "Dry-run",
            parse_yes_no,
        )?;

        let criteria = FilterCriteria {
            age_threshold_days,
            min_likes,
            min_reposts,
            keep_images,
            dry_run,
        };
        self.say(&crate::report::render_criteria_summary(&criteria))?;
        Ok(criteria)
    }

    pub fn confirm_actual_deletion(&mut self) -> Result<bool, CoreError> {
        self.say(&format!("\n{}", crate::report::RULE))?;
        let answer = self.ask(
            "\nYou chose to skip dry-run mode. Proceed with ACTUAL DELETION? [y/N]: ",
            "Proceed",
        )?;
        Ok(parse_default_no(&answer))
    }

    pub fn offer_real_run(&mut self) -> Result<bool, CoreError> {
        self.say(&format!("\n{}", crate::report::RULE))?;
        let answer = self.ask(
            "\nProceed with actual deletion using these same settings? [y/N]: ",
            "Proceed",
        )?;
        Ok(parse_default_no(&answer))
    }

    /// Final irreversible-action gate.
    pub fn confirm_phrase(&mut self) -> Result<Confirmation, CoreError> {
        self.say("\n⚠️  WARNING: This action is IRREVERSIBLE! ⚠️")?;
        self.say("Are you absolutely sure you want to delete these posts?")?;
        self.ask_until(
            "Type 'DELETE' (in all caps) to confirm: ",
            "Confirmation",
            parse_confirmation,
        )
    }
}
