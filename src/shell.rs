use anyhow::Result;
use console::style;
use dialoguer::{ theme::ColorfulTheme, Input, Select };
use std::path::PathBuf;

use crate::client::SearchClient;
use crate::render;
use crate::session::{ run_image_drop, run_text_search, DropState, SearchMode, SearchSession };

fn print_view(session: &SearchSession) {
    println!();
    for line in render::render_view(session).lines() {
        if line == render::TITLE || line == "Results" {
            println!("  {}", style(line).bold().cyan());
        } else if line.starts_with("Search failed") {
            println!("  {}", style(line).red());
        } else if line.starts_with("Score:") || line.starts_with("Metadata:") {
            println!("  {}", style(line).dim());
        } else {
            println!("  {}", line);
        }
    }
    println!();
}

/// Paths typed at the prompt stand in for files dropped on the target.
fn parse_dropped(input: &str) -> Vec<PathBuf> {
    input
        .split_whitespace()
        .map(|s| PathBuf::from(s.trim_matches(|c| c == '"' || c == '\'')))
        .collect()
}

pub async fn run_shell(client: SearchClient) -> Result<()> {
    let theme = ColorfulTheme::default();
    let mut session = SearchSession::new();
    println!("  {} {}", style("→").dim(), style(client.base_url()).cyan());

    loop {
        print_view(&session);

        let tabs = [SearchMode::Text.label(), SearchMode::Image.label(), "Quit"];
        let current = match session.mode() {
            SearchMode::Text => 0,
            SearchMode::Image => 1,
        };
        let selection = Select::with_theme(&theme)
            .with_prompt("Search mode")
            .items(&tabs)
            .default(current)
            .interact()?;

        match selection {
            0 => {
                session.set_mode(SearchMode::Text);
                let query: String = Input::with_theme(&theme)
                    .with_prompt("Enter your search query")
                    .with_initial_text(session.query().to_string())
                    .allow_empty(true)
                    .interact_text()?;
                session.set_query(query);
                run_text_search(&mut session, &client).await;
            }
            1 => {
                session.set_mode(SearchMode::Image);
                print_view(&session);
                let input: String = Input::with_theme(&theme)
                    .with_prompt("Image path")
                    .allow_empty(true)
                    .interact_text()?;
                let files = parse_dropped(&input);
                if files.is_empty() {
                    session.drag_leave();
                    continue;
                }
                if session.drag_over(&files) == DropState::Reject {
                    println!("  {}", style(render::drop_zone_prompt(DropState::Reject)).yellow());
                }
                if let Err(e) = run_image_drop(&mut session, &client, &files).await {
                    tracing::debug!(error = %e, "drop ignored");
                }
            }
            _ => {
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_paths_become_dropped_files() {
        assert_eq!(parse_dropped("  '/tmp/cat.png' "), vec![PathBuf::from("/tmp/cat.png")]);
        assert_eq!(parse_dropped("a.png b.jpg").len(), 2);
        assert!(parse_dropped("   ").is_empty());
    }
}
