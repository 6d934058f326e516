//! Terminal host for `sheetsplit`.
//!
//! Opens an `.xlsx` workbook, asks for the key column on stdin and writes one
//! sheet per distinct key back into the workbook.
//!
//! # Usage
//!
//! ```bash
//! sheetsplit orders.xlsx --sheet Data --output orders_split.xlsx
//!
//! # With debug logging
//! RUST_LOG=debug sheetsplit orders.xlsx
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use sheetsplit::conf::{
    C_EMPTY_KEY_SENTINEL, C_MENU_ITEM_LABEL, derive_default_split_options,
    derive_default_xlsx_store_options,
};
use sheetsplit::{
    HostUi, SpecPromptResponse, SpecSplitOptions, SplitError, XlsxWorkbook, run_split,
};

#[derive(Parser)]
#[command(
    version,
    about = C_MENU_ITEM_LABEL,
    long_about = "Split the rows of a sheet into one sheet per distinct key-column value."
)]
struct Args {
    /// Workbook to split.
    workbook: PathBuf,

    /// Sheet holding the rows (default: first sheet).
    #[arg(long)]
    sheet: Option<String>,

    /// Where to save the result (default: overwrite the input workbook).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Sheet name for rows whose key cell is blank.
    #[arg(long, default_value = C_EMPTY_KEY_SENTINEL)]
    empty_key: String,
}

/// Line-oriented dialogs. End of input counts as Cancel.
struct TerminalUi<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> TerminalUi<R, W> {
    fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, title: &str, message: &str, hint: &str) -> Option<String> {
        let res_written = write!(self.writer, "[{title}] {message} {hint}")
            .and_then(|()| self.writer.flush());
        if let Err(err) = res_written {
            warn!("Failed to write prompt: {err}");
            return None;
        }

        let mut c_line = String::new();
        match self.reader.read_line(&mut c_line) {
            Ok(0) => None,
            Ok(_) => Some(c_line.trim_end_matches(['\r', '\n']).to_string()),
            Err(err) => {
                warn!("Failed to read answer: {err}");
                None
            }
        }
    }
}

impl<R: BufRead, W: Write> HostUi for TerminalUi<R, W> {
    fn prompt_for_number(&mut self, title: &str, message: &str) -> SpecPromptResponse {
        match self.ask(title, message, "> ") {
            Some(text) => SpecPromptResponse {
                text,
                if_cancelled: false,
            },
            None => SpecPromptResponse {
                text: String::new(),
                if_cancelled: true,
            },
        }
    }

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self.ask(title, message, "[y/N] ")
            .is_some_and(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    fn alert(&mut self, title: &str, message: &str) {
        if let Err(err) = writeln!(self.writer, "[{title}] {message}") {
            warn!("Failed to show notice: {err}");
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let options = SpecSplitOptions {
        empty_key: args.empty_key,
        ..derive_default_split_options()
    };

    let mut store = match XlsxWorkbook::open(
        &args.workbook,
        args.sheet.as_deref(),
        derive_default_xlsx_store_options(),
    ) {
        Ok(store) => store,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(path_file_out) = &args.output {
        store.set_file_out(path_file_out);
    }

    let stdin = io::stdin();
    let mut ui = TerminalUi::new(stdin.lock(), io::stdout());

    let report = match run_split(&mut ui, &mut store, &options) {
        Ok(report) => report,
        Err(SplitError::UserCancelled) => return ExitCode::SUCCESS,
        Err(err) if err.is_user_facing() => return ExitCode::from(2),
        Err(err) => {
            error!("Split stopped: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = store.close() {
        error!("Failed to save {}: {err}", store.file_out());
        return ExitCode::FAILURE;
    }
    info!("Saved {}", store.file_out());

    println!("{report}");
    for c_warning in &report.warnings {
        println!("  warning: {c_warning}");
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_ui(input: &str) -> TerminalUi<&[u8], Vec<u8>> {
        TerminalUi::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn prompt_returns_line_without_newline() {
        let mut ui = derive_ui("2\n");
        let resp = ui.prompt_for_number("Confirm", "Which column?");
        assert_eq!(resp.text, "2");
        assert!(!resp.if_cancelled);
        assert_eq!(String::from_utf8(ui.writer).unwrap(), "[Confirm] Which column? > ");
    }

    #[test]
    fn end_of_input_cancels() {
        let mut ui = derive_ui("");
        assert!(ui.prompt_for_number("Confirm", "Which column?").if_cancelled);
        assert!(!ui.confirm("Confirm", "Start?"));
    }

    #[test]
    fn confirm_accepts_yes_only() {
        assert!(derive_ui("y\n").confirm("Confirm", "Start?"));
        assert!(derive_ui("YES\r\n").confirm("Confirm", "Start?"));
        assert!(!derive_ui("\n").confirm("Confirm", "Start?"));
        assert!(!derive_ui("no\n").confirm("Confirm", "Start?"));
    }

    #[test]
    fn help_uses_menu_label() {
        use clap::CommandFactory;

        let cmd = Args::command();
        assert_eq!(
            cmd.get_about().map(ToString::to_string).as_deref(),
            Some(C_MENU_ITEM_LABEL)
        );
    }

    #[test]
    fn args_default_empty_key() {
        let args = Args::parse_from(["sheetsplit", "book.xlsx"]);
        assert_eq!(args.empty_key, "empty");
        assert!(args.sheet.is_none());
        assert!(args.output.is_none());
    }
}
