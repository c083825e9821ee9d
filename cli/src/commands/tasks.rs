//! Rebuild task state from history

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use pf_memo::{CredentialProvider, MemoEngine, Task, TaskType};
use serde::Serialize;

use crate::commands::print_json;
use crate::config::load_config;
use crate::credentials::load_wallet_keys;
use crate::history::load_history;

#[derive(Serialize)]
#[serde(untagged)]
enum TaskReport<'a> {
    Ok {
        #[serde(flatten)]
        task: &'a Task,
        state: TaskType,
    },
    Failed {
        task_id: &'a str,
        error: String,
    },
}

pub fn run(
    config_path: Option<&Path>,
    history: &Path,
    wallet: &str,
    decrypt: bool,
    json: bool,
) -> Result<()> {
    let engine = MemoEngine::new(load_config(config_path)?)?;
    let records = load_history(history)?;

    let keys = if decrypt {
        Some(load_wallet_keys()?)
    } else {
        None
    };
    let credentials = keys.as_ref().map(|k| k as &dyn CredentialProvider);

    let messages = engine.decode_history(&records, wallet, credentials);
    let tasks = engine.reconstruct_tasks(&messages);

    if json {
        let report: Vec<TaskReport<'_>> = tasks
            .iter()
            .map(|(task_id, result)| match result {
                Ok(task) => TaskReport::Ok {
                    task,
                    state: task.current_state(),
                },
                Err(e) => TaskReport::Failed {
                    task_id,
                    error: e.to_string(),
                },
            })
            .collect();
        return print_json(&report);
    }

    if tasks.is_empty() {
        println!("{}", "No tasks found.".yellow());
        return Ok(());
    }

    println!();
    println!("{}", format!("{} task(s):", tasks.len()).green().bold());
    println!();

    for (task_id, result) in &tasks {
        match result {
            Ok(task) => {
                let state = task.current_state();
                let label = match state {
                    TaskType::Reward => state.to_string().green(),
                    TaskType::Refusal => state.to_string().red(),
                    TaskType::VerificationPrompt => state.to_string().yellow().bold(),
                    _ => state.to_string().cyan(),
                };
                println!("{} [{}]", task_id.yellow(), label);
                println!("   Request:  {}", task.request.text);
                if let Some(proposal) = &task.proposal {
                    println!("   Proposal: {}", proposal.text);
                }
                if task.is_verification_pending() {
                    if let Some(prompt) = &task.verification_prompt {
                        println!("   Verify:   {}", prompt.text);
                    }
                }
                if task.is_rewarded() {
                    println!("   Reward:   {} PFT", task.reward_amount);
                }
                println!(
                    "   Updated:  {}",
                    task.last_activity().format("%Y-%m-%d %H:%M")
                );
            }
            Err(e) => {
                println!("{} [{}]", task_id.yellow(), "ERROR".red());
                println!("   {}", e.to_string().dimmed());
            }
        }
        println!();
    }

    Ok(())
}
