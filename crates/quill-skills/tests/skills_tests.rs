#[cfg(test)]
mod tests {
    use quill_core::{AiConfig, ToolContext, ToolInfo, ToolRegistry};
    use quill_llm::{GeneratorRouter, MockGenerator};
    use quill_skills::{
        Backends, HybridSkill, MergeStrategy, Orchestration, ParameterType, PromptSkill,
        ResultMerge, Skill, SkillCategory, SkillContext, SkillDefinition, SkillManager,
        SkillParameter, SkillStore, StepConfig, SubSkillRef, ToolSkill, WorkflowSkill,
        WorkflowStep, fill, resolve,
    };
    use quill_tools::PluginHost;
    use serde_json::{Map, Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingTools {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ToolRegistry for RecordingTools {
        fn tools(&self) -> Vec<ToolInfo> {
            Vec::new()
        }

        async fn invoke(
            &self,
            tool: &str,
            params: Map<String, Value>,
            _context: &ToolContext,
        ) -> quill_core::Result<Value> {
            self.calls.lock().unwrap().push(tool.to_string());
            Ok(Value::Object(params))
        }
    }

    fn backends(generator: Arc<MockGenerator>) -> Backends {
        Backends::new(
            GeneratorRouter::new().with_generator(generator),
            Arc::new(PluginHost::with_builtins()),
        )
    }

    fn ctx() -> SkillContext {
        SkillContext::new(AiConfig::new("mock"))
    }

    fn prompt(id: &str, template: &str) -> Skill {
        Skill::new(
            id,
            id.to_uppercase(),
            "test skill",
            SkillDefinition::Prompt(PromptSkill {
                template: template.into(),
                parameters: vec![],
                system_prompt: None,
                model: None,
            }),
        )
    }

    fn hybrid(id: &str, children: &[&str], merge: Option<MergeStrategy>) -> Skill {
        Skill::new(
            id,
            "Hybrid",
            "composed",
            SkillDefinition::Hybrid(HybridSkill {
                skills: children.iter().map(|c| SubSkillRef::new(*c)).collect(),
                orchestration: Orchestration::default(),
                result_merge: merge.map(|strategy| ResultMerge {
                    strategy,
                    template: None,
                }),
            }),
        )
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ── Templates and references ───────────────────────────────

    #[test]
    fn test_template_substitution() {
        let data = object(json!({ "name": "Ada", "n": 3 }));
        assert_eq!(
            fill("Hi {{name}}, you have {{n}} {{unit}}", &data),
            "Hi Ada, you have 3 {{unit}}"
        );
    }

    #[test]
    fn test_unresolved_reference_stays_literal() {
        let out = resolve(&json!("$x"), &Map::new(), &Map::new());
        assert_eq!(out, json!("$x"));
    }

    // ── Prompt skills ──────────────────────────────────────────

    #[tokio::test]
    async fn test_prompt_skill_fills_defaults_and_counts_tokens() {
        let generator = Arc::new(MockGenerator::new("mock").with_response("an outline"));
        let mut manager = SkillManager::new(backends(generator.clone()));
        let mut skill = prompt("outline", "Outline {{content}} in {{style}} style");
        if let SkillDefinition::Prompt(p) = &mut skill.definition {
            p.parameters = vec![
                SkillParameter::required("content", "text", ParameterType::String),
                SkillParameter::optional("style", "style", "general"),
            ];
        }
        manager.register(skill).unwrap();

        let mut context = ctx().with_param("content", "rust");
        let result = manager.execute("outline", &mut context).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, Some(json!("an outline")));
        let details = result.details.unwrap();
        assert_eq!(details.steps_executed, 1);
        assert_eq!(details.tokens_used, Some(150));
        assert_eq!(
            generator.recorded_requests().lock()[0].prompt,
            "Outline rust in general style"
        );
    }

    #[tokio::test]
    async fn test_missing_required_parameter_fails() {
        let generator = Arc::new(MockGenerator::echo("mock"));
        let mut manager = SkillManager::new(backends(generator.clone()));
        let mut skill = prompt("needs", "{{content}}");
        if let SkillDefinition::Prompt(p) = &mut skill.definition {
            p.parameters = vec![SkillParameter::required("content", "text", ParameterType::String)];
        }
        manager.register(skill).unwrap();

        let result = manager.execute("needs", &mut ctx()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("missing required parameter: content"));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_skill_is_not_executed() {
        let generator = Arc::new(MockGenerator::echo("mock"));
        let mut manager = SkillManager::new(backends(generator.clone()));
        manager.register(prompt("quiet", "{{text}}").disabled()).unwrap();

        let result = manager.execute("quiet", &mut ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not enabled"));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_tool_skill_never_calls_tool() {
        let generator = Arc::new(MockGenerator::echo("mock"));
        let tools = Arc::new(RecordingTools::default());
        let mut manager = SkillManager::new(Backends::new(
            GeneratorRouter::new().with_generator(generator.clone()),
            tools.clone(),
        ));
        let skill = Skill::new(
            "count",
            "Count",
            "word count",
            SkillDefinition::Tool(ToolSkill {
                tool: "word_count".into(),
                parameter_mapping: Map::new(),
                result_processing: None,
            }),
        );
        manager.register(skill.disabled()).unwrap();

        let result = manager.execute("count", &mut ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not enabled"));
        assert!(tools.calls.lock().unwrap().is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_skill_fails() {
        let manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        let result = manager.execute("ghost", &mut ctx()).await;
        assert_eq!(result.error.as_deref(), Some("skill not found: ghost"));
    }

    // ── Workflows ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_misordered_dependency_fails_before_step_runs() {
        let generator = Arc::new(MockGenerator::echo("mock"));
        let manager_backends = backends(generator.clone());
        let workflow = WorkflowSkill::sequential(vec![
            WorkflowStep::new("B", "B", StepConfig::prompt("second")).depends_on(&["A"]),
            WorkflowStep::new("A", "A", StepConfig::prompt("first")),
        ]);

        // Registration rejects the forward reference outright.
        let mut manager = SkillManager::new(manager_backends.clone());
        let skill = Skill::new("wf", "WF", "d", SkillDefinition::Workflow(workflow.clone()));
        assert!(manager.register(skill).is_err());

        // Run directly, the runner fails lazily before B executes.
        let err = quill_skills::workflow::run_workflow(
            &manager_backends,
            &workflow,
            &mut ctx(),
            &mut Map::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "dependency not met: A");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_workflow_output_propagates_and_reports_intermediates() {
        let generator = Arc::new(
            MockGenerator::new("mock")
                .with_response("draft text")
                .with_response("polished text"),
        );
        let mut manager = SkillManager::new(backends(generator.clone()));
        let workflow = WorkflowSkill::sequential(vec![
            WorkflowStep::new("step1", "Draft", StepConfig::prompt("Draft {{topic}}")),
            WorkflowStep::new("step2", "Polish", StepConfig::prompt("Polish {{step1}}"))
                .depends_on(&["step1"]),
        ]);
        manager
            .register(Skill::new("wf", "WF", "d", SkillDefinition::Workflow(workflow)))
            .unwrap();

        let mut context = ctx().with_param("topic", "rust");
        let result = manager.execute("wf", &mut context).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, Some(json!("polished text")));
        assert_eq!(generator.recorded_requests().lock()[1].prompt, "Polish draft text");
        let intermediate = result.intermediate_results.unwrap();
        assert_eq!(intermediate["step1"], "draft text");
        let details = result.details.unwrap();
        assert_eq!(details.steps_executed, 2);
        assert_eq!(details.tokens_used, Some(300));
    }

    #[tokio::test]
    async fn test_failed_workflow_reports_completed_steps() {
        let generator = Arc::new(
            MockGenerator::new("mock")
                .with_response("ok")
                .with_error("upstream down"),
        );
        let mut manager = SkillManager::new(backends(generator));
        let workflow = WorkflowSkill::sequential(vec![
            WorkflowStep::new("a", "A", StepConfig::prompt("one")),
            WorkflowStep::new("b", "B", StepConfig::prompt("two")),
        ]);
        manager
            .register(Skill::new("wf", "WF", "d", SkillDefinition::Workflow(workflow)))
            .unwrap();

        let result = manager.execute("wf", &mut ctx()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("generation failed: upstream down"));
        assert_eq!(result.details.unwrap().steps_executed, 1);
    }

    // ── Tool skills ────────────────────────────────────────────

    #[tokio::test]
    async fn test_builtin_tool_skill_formats_markdown() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        manager.register_builtin_skills().unwrap();

        let mut context = ctx().with_param("content", "one two\n\nthree");
        let result = manager.execute("skill-text-stats", &mut context).await;

        assert!(result.success, "{:?}", result.error);
        let text = result.output.unwrap();
        let text = text.as_str().unwrap();
        assert!(text.contains("**Words:** 3"), "{text}");
        assert!(text.contains("**Paragraphs:** 2"), "{text}");
    }

    #[tokio::test]
    async fn test_tool_skill_for_disabled_plugin_fails() {
        let host = PluginHost::with_builtins();
        host.disable(quill_tools::builtin::TEXT_PLUGIN_ID).unwrap();
        let mut manager = SkillManager::new(Backends::new(
            GeneratorRouter::new().with_generator(Arc::new(MockGenerator::echo("mock"))),
            Arc::new(host),
        ));
        manager.register_builtin_skills().unwrap();

        let mut context = ctx().with_param("content", "words");
        let result = manager.execute("skill-text-stats", &mut context).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("plugin not enabled"));
    }

    // ── Hybrid skills ──────────────────────────────────────────

    #[tokio::test]
    async fn test_hybrid_append_flattens_outputs() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        let list = |id: &str, items: Value| {
            Skill::new(
                id,
                id,
                "list",
                SkillDefinition::Workflow(WorkflowSkill::sequential(vec![WorkflowStep::new(
                    "out",
                    "Out",
                    StepConfig::transform("identity", items),
                )])),
            )
        };
        manager.register(list("first", json!(["a", "b"]))).unwrap();
        manager.register(list("second", json!(["c"]))).unwrap();
        manager
            .register(hybrid("both", &["first", "second"], Some(MergeStrategy::Append)))
            .unwrap();

        let result = manager.execute("both", &mut ctx()).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, Some(json!(["a", "b", "c"])));
        assert_eq!(result.details.unwrap().steps_executed, 2);
    }

    #[tokio::test]
    async fn test_hybrid_aborts_on_first_failure() {
        let generator = Arc::new(MockGenerator::echo("mock"));
        let mut manager = SkillManager::new(backends(generator.clone()));
        manager.register(prompt("s1", "first")).unwrap();
        manager.register(prompt("s2", "second")).unwrap();
        manager.disable("s1").unwrap();
        manager.register(hybrid("h", &["s1", "s2"], None)).unwrap();

        let result = manager.execute("h", &mut ctx()).await;
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with("sub-skill s1 failed"), "{error}");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_tokens_roll_up() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::new("mock"))));
        manager.register(prompt("s1", "one")).unwrap();
        manager.register(prompt("s2", "two")).unwrap();
        manager.register(hybrid("h", &["s1", "s2"], None)).unwrap();

        let result = manager.execute("h", &mut ctx()).await;
        assert!(result.success);
        assert_eq!(result.tokens_used(), 300);
    }

    #[tokio::test]
    async fn test_mutual_recursion_hits_depth_limit() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        manager.register(hybrid("ping", &["pong"], None)).unwrap();
        manager.register(hybrid("pong", &["ping"], None)).unwrap();

        let result = manager.execute("ping", &mut ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("nesting too deep"));
    }

    // ── Registry ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_invalid() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        manager.register(prompt("a", "x")).unwrap();
        assert_eq!(
            manager.register(prompt("a", "y")).unwrap_err().to_string(),
            "skill already registered: a"
        );
        assert!(manager.register(prompt("b", "")).is_err());
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister_requires_disabled() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        manager.register(prompt("a", "x")).unwrap();
        assert!(manager.unregister("a").is_err());
        manager.disable("a").unwrap();
        assert_eq!(manager.unregister("a").unwrap().id, "a");
        assert!(manager.is_empty());
        assert!(manager.unregister("a").is_err());
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let mut source = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        source.register_builtin_skills().unwrap();
        let exported = source.export("skill-blog-post").unwrap();

        let mut target = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        let imported = target.import(exported).unwrap();
        assert_eq!(&imported, source.get("skill-blog-post").unwrap());
    }

    #[tokio::test]
    async fn test_import_applies_defaults_and_requires_core_fields() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        let skill = manager
            .import(json!({
                "id": "mini",
                "name": "Mini",
                "description": "tiny",
                "definition": { "type": "prompt", "template": "{{text}}" }
            }))
            .unwrap();
        assert!(skill.enabled);
        assert_eq!(skill.category, SkillCategory::Custom);
        assert_eq!(skill.version, "1.0.0");

        let err = manager.import(json!({ "id": "x" })).unwrap_err();
        assert!(err.to_string().contains("missing name"), "{err}");
    }

    #[tokio::test]
    async fn test_search_and_category_listing() {
        let mut manager = SkillManager::new(backends(Arc::new(MockGenerator::echo("mock"))));
        manager.register_builtin_skills().unwrap();
        assert!(manager.register_builtin_skills().unwrap().is_empty());

        let hits: Vec<_> = manager.search("TRANSLATE").iter().map(|s| s.id.clone()).collect();
        assert_eq!(hits, vec!["skill-translate-en", "skill-translate-zh"]);
        assert_eq!(manager.list_by_category(SkillCategory::Editing).len(), 4);
    }

    // ── Persistence ────────────────────────────────────────────

    #[tokio::test]
    async fn test_mutations_persist_across_managers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.json");
        let generator = Arc::new(MockGenerator::echo("mock"));

        let mut manager =
            SkillManager::with_store(backends(generator.clone()), SkillStore::new(&path)).unwrap();
        manager.register(prompt("kept", "{{text}}")).unwrap();
        manager.register(prompt("toggled", "{{text}}")).unwrap();
        manager.disable("toggled").unwrap();

        let reloaded =
            SkillManager::with_store(backends(generator), SkillStore::new(&path)).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get("kept").unwrap().enabled);
        assert!(!reloaded.get("toggled").unwrap().enabled);
    }

    #[tokio::test]
    async fn test_invalid_stored_skill_survives_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.json");
        let legacy = Skill::new(
            "legacy",
            "Legacy",
            "written before dependency checks",
            SkillDefinition::Workflow(WorkflowSkill::sequential(vec![
                WorkflowStep::new("b", "B", StepConfig::prompt("second")).depends_on(&["a"]),
                WorkflowStep::new("a", "A", StepConfig::prompt("first")),
            ])),
        );
        SkillStore::new(&path).save([&legacy]).unwrap();

        let generator = Arc::new(MockGenerator::echo("mock"));
        let mut manager =
            SkillManager::with_store(backends(generator.clone()), SkillStore::new(&path)).unwrap();
        assert!(manager.get("legacy").is_some());
        manager.register(prompt("fresh", "{{text}}")).unwrap();

        let stored = SkillStore::new(&path).load().unwrap();
        let ids: Vec<&str> = stored.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"legacy"));
        assert!(ids.contains(&"fresh"));

        let result = manager.execute("legacy", &mut ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("invalid skill"));
        assert_eq!(generator.call_count(), 0);
    }
}
