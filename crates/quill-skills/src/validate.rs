//! Structural checks run before a skill enters the registry.

use std::collections::HashSet;

use crate::skill::{Skill, SkillDefinition, WorkflowSkill};

/// Every violation found in `skill`; empty means valid.
pub fn validate(skill: &Skill) -> Vec<String> {
    let mut errors = Vec::new();

    if skill.id.trim().is_empty() {
        errors.push("skill must have an id".to_string());
    }
    if skill.name.trim().is_empty() {
        errors.push("skill must have a name".to_string());
    }
    if skill.description.trim().is_empty() {
        errors.push("skill must have a description".to_string());
    }

    match &skill.definition {
        SkillDefinition::Prompt(p) => {
            if p.template.trim().is_empty() {
                errors.push("prompt skill must have a template".to_string());
            }
        }
        SkillDefinition::Workflow(w) => {
            if w.steps.is_empty() {
                errors.push("workflow skill must have steps".to_string());
            }
            errors.extend(workflow_graph_errors(w));
        }
        SkillDefinition::Tool(t) => {
            if t.tool.trim().is_empty() {
                errors.push("tool skill must specify a tool".to_string());
            }
        }
        SkillDefinition::Hybrid(h) => {
            if h.skills.is_empty() {
                errors.push("hybrid skill must have sub-skills".to_string());
            }
            for entry in &h.skills {
                if entry.skill_id.trim().is_empty() {
                    errors.push("hybrid sub-skill reference must have a skillId".to_string());
                } else if entry.skill_id == skill.id {
                    errors.push("hybrid skill cannot reference itself".to_string());
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for param in skill.parameters() {
        if !seen.insert(param.name.as_str()) {
            errors.push(format!("duplicate parameter: {}", param.name));
        }
    }

    errors
}

/// Step ids are unique, step types agree with their configs, and every
/// dependency names a step declared earlier.
fn workflow_graph_errors(workflow: &WorkflowSkill) -> Vec<String> {
    let mut errors = Vec::new();
    let all: HashSet<&str> = workflow.steps.iter().map(|s| s.id.as_str()).collect();
    let mut earlier: HashSet<&str> = HashSet::new();

    for step in &workflow.steps {
        if step.id.trim().is_empty() {
            errors.push(format!("step \"{}\" must have an id", step.name));
        } else if earlier.contains(step.id.as_str()) {
            errors.push(format!("duplicate step id: {}", step.id));
        }

        if step.step_type != step.config.step_type() {
            errors.push(format!(
                "step {} is declared as {} but configured as {}",
                step.id,
                step.step_type,
                step.config.step_type()
            ));
        }

        for dep in &step.depends_on {
            if dep == &step.id {
                errors.push(format!("step {} depends on itself", step.id));
            } else if !all.contains(dep.as_str()) {
                errors.push(format!("step {} depends on unknown step {dep}", step.id));
            } else if !earlier.contains(dep.as_str()) {
                errors.push(format!(
                    "step {} depends on {dep}, which is declared after it",
                    step.id
                ));
            }
        }

        earlier.insert(step.id.as_str());
    }

    errors
}
