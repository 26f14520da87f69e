//! Interactive mode for bare `refract` on a terminal.
//!
//! Offers the same actions as the subcommands and runs them through
//! [`crate::cli::run::perform`], so a failing action returns to the menu
//! instead of exiting.

pub mod theme;

use console::Style;
use dialoguer::{Confirm, Select};
use refract_core::Config;

use crate::cli::run::{self, Action, RunArgs};

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

const ACTIONS: [Action; 5] = [
    Action::Metadata,
    Action::Describe,
    Action::Render,
    Action::Prefix,
    Action::Pipeline,
];

/// Map a menu prompt result to the chosen action. Exit, Esc and an
/// interrupted terminal all yield `None`.
fn chosen_action(result: dialoguer::Result<Option<usize>>) -> anyhow::Result<Option<Action>> {
    Ok(handle_interrupt(result)?
        .flatten()
        .and_then(|i| ACTIONS.get(i).copied()))
}

fn menu_items() -> Vec<&'static str> {
    ACTIONS
        .iter()
        .map(Action::description)
        .chain(std::iter::once("Exit"))
        .collect()
}

/// Entry point for interactive mode.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    theme::print_banner(config);

    let theme = theme::refract_theme();
    let items = menu_items();

    loop {
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&items)
            .default(0)
            .interact_opt();

        let Some(action) = chosen_action(selection)? else {
            break; // Exit or Ctrl+C / Esc
        };

        let mut args = RunArgs::default();
        if action.writes_stage_outputs() {
            let Some(overwrite) = handle_interrupt(
                Confirm::with_theme(&theme)
                    .with_prompt("Regenerate outputs that already exist?")
                    .default(false)
                    .interact(),
            )?
            else {
                continue;
            };
            args.overwrite = overwrite;
        }

        let mut run_config = config.clone();
        args.apply(&mut run_config, action);
        match run::perform(action, run_config).await {
            Ok(true) => {}
            Ok(false) => {
                let warn = Style::new().for_stderr().yellow();
                eprintln!("  {}", warn.apply_to("Finished with failures; see the log above."));
            }
            Err(e) => {
                let err = Style::new().for_stderr().red();
                eprintln!("  {} {e}", err.apply_to("✗"));
            }
        }
        eprintln!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lists_actions_then_exit() {
        let items = menu_items();
        assert_eq!(items.len(), 6);
        assert_eq!(items[0], "Generate metadata from images");
        assert_eq!(items[4], "Run the full pipeline (metadata -> text -> images)");
        assert_eq!(items[5], "Exit");
    }

    #[test]
    fn test_interrupted_menu_exits_cleanly() {
        let interrupted = Err(dialoguer::Error::IO(std::io::Error::from(
            std::io::ErrorKind::Interrupted,
        )));
        assert_eq!(chosen_action(interrupted).unwrap(), None);

        assert_eq!(chosen_action(Ok(None)).unwrap(), None);
        assert_eq!(chosen_action(Ok(Some(ACTIONS.len()))).unwrap(), None);
        assert_eq!(chosen_action(Ok(Some(1))).unwrap(), Some(Action::Describe));

        let broken = Err(dialoguer::Error::IO(std::io::Error::from(
            std::io::ErrorKind::BrokenPipe,
        )));
        assert!(chosen_action(broken).is_err());
    }
}
