use serde_json::{Map, Value};
use std::sync::Arc;

use quill_config::QuillConfig;
use quill_core::{AiConfig, Environment, LogLevel, QuillError};
use quill_skills::{Skill, SkillCategory, SkillContext, SkillDefinition, SkillResult};

use super::SkillAction;
use super::engine::open_manager;

pub(super) async fn cmd_skill(config: &QuillConfig, action: SkillAction) -> quill_core::Result<()> {
    let mut manager = open_manager(config)?;

    match action {
        SkillAction::List { category } => {
            let skills = match category {
                Some(c) => {
                    let category: SkillCategory = c.parse().map_err(QuillError::Config)?;
                    manager.list_by_category(category)
                }
                None => manager.list(),
            };
            if skills.is_empty() {
                println!("No skills registered.");
                println!("  Add the builtin library with: quill skill builtin");
            } else {
                println!("\x1b[1mSkills ({}):\x1b[0m\n", skills.len());
                for s in skills {
                    print_summary(s);
                }
            }
        }
        SkillAction::Show { id } => match manager.get(&id) {
            Some(skill) => print_details(skill),
            None => println!("Skill '{id}' not found."),
        },
        SkillAction::Search { query } => {
            let hits = manager.search(&query);
            if hits.is_empty() {
                println!("No skills matching '{query}'.");
            } else {
                for s in hits {
                    print_summary(s);
                }
            }
        }
        SkillAction::Run {
            id,
            param,
            document,
            json,
        } => {
            let mut input = Map::new();
            for (key, raw) in param {
                input.insert(key, parse_param_value(&raw));
            }

            let environment = Environment {
                document_path: document.map(|p| p.display().to_string()),
                workspace_path: std::env::current_dir()
                    .ok()
                    .map(|p| p.display().to_string()),
                ..Default::default()
            };
            let ai_config = AiConfig {
                provider: config.ai.provider.clone(),
                model: config.ai.model.clone(),
            };
            let mut ctx = SkillContext::new(ai_config)
                .with_input(input)
                .with_environment(environment)
                .with_log(Arc::new(|level: LogLevel, msg: &str| {
                    if level == LogLevel::Error {
                        eprintln!("\x1b[31m[{level}]\x1b[0m {msg}");
                    }
                }))
                .with_progress(Arc::new(|current: usize, total: usize, msg: &str| {
                    eprintln!("\x1b[2m[{current}/{total}] {msg}\x1b[0m");
                }));

            let result = manager.execute(&id, &mut ctx).await;
            print_result(&result, json)?;
            if !result.success {
                return Err(QuillError::Other(anyhow::anyhow!(
                    "skill {id} failed"
                )));
            }
        }
        SkillAction::Enable { id } => {
            manager.enable(&id)?;
            println!("✅ Enabled {id}");
        }
        SkillAction::Disable { id } => {
            manager.disable(&id)?;
            println!("✅ Disabled {id}");
        }
        SkillAction::Remove { id } => {
            let removed = manager.unregister(&id)?;
            println!("✅ Removed {} ({})", removed.name, removed.id);
        }
        SkillAction::Import { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let document: Value = serde_json::from_str(&raw)?;
            let skill = manager.import(document)?;
            println!("✅ Imported {} ({})", skill.name, skill.id);
        }
        SkillAction::Export { id, output } => {
            let document = manager.export(&id)?;
            let text = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    println!("✅ Exported {id} to {}", path.display());
                }
                None => println!("{text}"),
            }
        }
        SkillAction::Builtin => {
            let added = manager.register_builtin_skills()?;
            if added.is_empty() {
                println!("All builtin skills are already registered.");
            } else {
                println!("✅ Registered {} builtin skills:", added.len());
                for id in added {
                    println!("  {id}");
                }
            }
        }
    }
    Ok(())
}

/// Values that parse as JSON (numbers, booleans, arrays, objects, quoted
/// strings) are passed through as JSON; anything else is a plain string.
fn parse_param_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_summary(s: &Skill) {
    let state = if s.enabled { "" } else { " \x1b[2m(disabled)\x1b[0m" };
    println!(
        "  \x1b[36m{}\x1b[0m {} [{}/{}]{}",
        s.id,
        s.name,
        s.category,
        s.definition.kind(),
        state
    );
    println!("    {}", s.description);
    println!();
}

fn print_details(skill: &Skill) {
    println!("\x1b[1m{}\x1b[0m v{} ({})", skill.name, skill.version, skill.id);
    println!("  {}", skill.description);
    println!("  Category: {}", skill.category);
    println!("  Type: {}", skill.definition.kind());
    println!("  Enabled: {}", skill.enabled);
    if let Some(ref author) = skill.author {
        println!("  Author: {author}");
    }
    if !skill.tags.is_empty() {
        println!("  Tags: {}", skill.tags.join(", "));
    }
    if let Some(ref shortcut) = skill.shortcut {
        println!("  Shortcut: {shortcut}");
    }

    let params = skill.parameters();
    if !params.is_empty() {
        println!("\n  \x1b[1mParameters:\x1b[0m");
        for p in params {
            let required = if p.required { " (required)" } else { "" };
            let default = p
                .default
                .as_ref()
                .map(|d| format!(" [default: {d}]"))
                .unwrap_or_default();
            println!("    {}: {:?}{required}{default}", p.name, p.param_type);
            println!("      {}", p.description);
        }
    }

    match &skill.definition {
        SkillDefinition::Workflow(w) => {
            println!("\n  \x1b[1mSteps:\x1b[0m");
            for (i, step) in w.steps.iter().enumerate() {
                let deps = if step.depends_on.is_empty() {
                    String::new()
                } else {
                    format!(" after {}", step.depends_on.join(", "))
                };
                println!("    {}. {} [{}] {}{deps}", i + 1, step.id, step.step_type, step.name);
            }
        }
        SkillDefinition::Tool(t) => println!("\n  Tool: {}", t.tool),
        SkillDefinition::Hybrid(h) => {
            println!("\n  \x1b[1mSub-skills:\x1b[0m");
            for entry in &h.skills {
                println!("    {}", entry.skill_id);
            }
        }
        SkillDefinition::Prompt(_) => {}
    }
}

fn print_result(result: &SkillResult, json: bool) -> quill_core::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    match (&result.output, &result.error) {
        (Some(Value::String(text)), _) => println!("{text}"),
        (Some(other), _) => println!("{}", serde_json::to_string_pretty(other)?),
        (None, Some(error)) => eprintln!("❌ {error}"),
        (None, None) => {}
    }

    if let Some(ref details) = result.details {
        let tokens = details
            .tokens_used
            .map(|t| format!(", {t} tokens"))
            .unwrap_or_default();
        eprintln!(
            "\x1b[2m{} steps in {}ms{tokens}\x1b[0m",
            details.steps_executed, details.execution_time
        );
    }
    Ok(())
}
