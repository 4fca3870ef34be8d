//! The skill library shipped with Quill.

use serde_json::{Map, Value};

use crate::skill::{
    HybridSkill, MergeStrategy, ModelConfig, Orchestration, ParameterType, ParameterUi,
    PromptSkill, ResultFormat, ResultMerge, ResultProcessing, Skill, SkillCategory,
    SkillDefinition, SkillParameter, StepConfig, SubSkillRef, ToolSkill, WorkflowSkill,
    WorkflowStep,
};

fn text_param(name: &str, description: &str) -> SkillParameter {
    SkillParameter::required(name, description, ParameterType::String).with_ui(ParameterUi {
        multiline: Some(true),
        ..Default::default()
    })
}

struct PromptTemplate<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    category: SkillCategory,
    tags: &'a [&'a str],
    template: &'a str,
    parameters: Vec<SkillParameter>,
    system_prompt: Option<&'a str>,
    sampling: (f32, u32),
}

fn prompt_skill(def: PromptTemplate<'_>) -> Skill {
    Skill::new(
        def.id,
        def.name,
        def.description,
        SkillDefinition::Prompt(PromptSkill {
            template: def.template.to_string(),
            parameters: def.parameters,
            system_prompt: def.system_prompt.map(str::to_string),
            model: Some(ModelConfig::sampling(def.sampling.0, def.sampling.1)),
        }),
    )
    .with_category(def.category)
    .with_tags(def.tags)
}

fn prompt_step(id: &str, name: &str, template: &str, sampling: (f32, u32)) -> WorkflowStep {
    WorkflowStep::new(
        id,
        name,
        StepConfig::Prompt(crate::skill::PromptStepConfig {
            template: template.to_string(),
            model: Some(ModelConfig::sampling(sampling.0, sampling.1)),
        }),
    )
}

fn writing_skills() -> Vec<Skill> {
    let mut continue_writing = prompt_skill(PromptTemplate {
        id: "skill-continue-writing",
        name: "Continue Writing",
        description: "Continue the text from the surrounding context",
        category: SkillCategory::Writing,
        tags: &["writing", "continue"],
        template: "Continue writing from the context below, keeping the same style and tone.\n\n\
                   Context:\n{{context}}\n\nText at the cursor:\n{{cursor}}\n\nContinuation:",
        parameters: vec![
            text_param("context", "Surrounding content"),
            SkillParameter::optional("cursor", "Content at the cursor", ""),
        ],
        system_prompt: Some(
            "You are a professional writer who continues texts in any style. \
             Preserve the original voice, tone and flow.",
        ),
        sampling: (0.7, 500),
    });
    continue_writing.shortcut = Some("Cmd+L".into());

    vec![
        continue_writing,
        prompt_skill(PromptTemplate {
            id: "skill-expand-text",
            name: "Expand Text",
            description: "Expand a short passage into a detailed paragraph",
            category: SkillCategory::Writing,
            tags: &["writing", "expand"],
            template: "Expand the following content into a more detailed paragraph.\n\n\
                       Original:\n{{content}}\n\nRequirements:\n\
                       1. Keep the core argument\n\
                       2. Add concrete examples and details\n\
                       3. Make it vivid and specific\n\nExpanded content:",
            parameters: vec![text_param("content", "Content to expand")],
            system_prompt: None,
            sampling: (0.6, 800),
        }),
        prompt_skill(PromptTemplate {
            id: "skill-summarize",
            name: "Summarize",
            description: "Produce a short summary of a long text",
            category: SkillCategory::Writing,
            tags: &["writing", "summary"],
            template: "Write a concise summary (at most 200 words) of the following text.\n\n\
                       Text:\n{{content}}\n\nSummary:",
            parameters: vec![text_param("content", "Content to summarize")],
            system_prompt: None,
            sampling: (0.3, 300),
        }),
    ]
}

fn editing_skills() -> Vec<Skill> {
    vec![
        prompt_skill(PromptTemplate {
            id: "skill-polish-professional",
            name: "Professional Polish",
            description: "Rewrite content in a professional register",
            category: SkillCategory::Editing,
            tags: &["editing", "polish", "professional"],
            template: "Polish the following content into a professional style without \
                       changing its meaning.\n\nOriginal:\n{{content}}\n\nPolished content:",
            parameters: vec![text_param("content", "Content to polish")],
            system_prompt: Some(
                "You are a professional editor who turns any draft into clear, formal prose.",
            ),
            sampling: (0.4, 1000),
        }),
        prompt_skill(PromptTemplate {
            id: "skill-fix-grammar",
            name: "Fix Grammar",
            description: "Find and correct grammatical errors",
            category: SkillCategory::Editing,
            tags: &["editing", "grammar"],
            template: "Correct the grammar of the following content. \
                       Output only the corrected text.\n\n{{content}}",
            parameters: vec![text_param("content", "Content to check")],
            system_prompt: Some("You are a meticulous proofreader."),
            sampling: (0.2, 2000),
        }),
        prompt_skill(PromptTemplate {
            id: "skill-translate-zh",
            name: "Translate to Chinese",
            description: "Translate content into Chinese",
            category: SkillCategory::Editing,
            tags: &["editing", "translation"],
            template: "请将以下内容翻译为中文，保持原文的含义和风格：\n\n{{content}}",
            parameters: vec![text_param("content", "Content to translate")],
            system_prompt: None,
            sampling: (0.3, 2000),
        }),
        prompt_skill(PromptTemplate {
            id: "skill-translate-en",
            name: "Translate to English",
            description: "Translate content into English",
            category: SkillCategory::Editing,
            tags: &["editing", "translation"],
            template: "Please translate the following content into English, maintaining \
                       the original meaning and style:\n\n{{content}}",
            parameters: vec![text_param("content", "Content to translate")],
            system_prompt: None,
            sampling: (0.3, 2000),
        }),
    ]
}

fn analysis_skills() -> Vec<Skill> {
    vec![
        prompt_skill(PromptTemplate {
            id: "skill-extract-keywords",
            name: "Extract Keywords",
            description: "Pull the key terms out of a text",
            category: SkillCategory::Analysis,
            tags: &["analysis", "keywords"],
            template: "Extract 5-10 keywords from the following content, separated by \
                       commas.\n\n{{content}}\n\nKeywords:",
            parameters: vec![text_param("content", "Content to analyze")],
            system_prompt: None,
            sampling: (0.3, 100),
        }),
        prompt_skill(PromptTemplate {
            id: "skill-analyze-sentiment",
            name: "Sentiment Analysis",
            description: "Rate the sentiment of a text",
            category: SkillCategory::Analysis,
            tags: &["analysis", "sentiment"],
            template: "Analyze the sentiment of the following content and score it between \
                       -1 (most negative) and 1 (most positive).\n\n{{content}}\n\n\
                       Answer in this format:\nSentiment: [positive/negative/neutral]\n\
                       Score: [number]\nReason: [one sentence]",
            parameters: vec![text_param("content", "Content to analyze")],
            system_prompt: None,
            sampling: (0.2, 200),
        }),
        prompt_skill(PromptTemplate {
            id: "skill-generate-outline",
            name: "Generate Outline",
            description: "Draft an article outline for a topic",
            category: SkillCategory::Analysis,
            tags: &["analysis", "outline"],
            template: "Create a detailed article outline.\n\nTopic: {{topic}}\n\
                       Style: {{style}}\n\nOutline:",
            parameters: vec![
                SkillParameter::required("topic", "Article topic", ParameterType::String),
                SkillParameter::optional("style", "Article style", "general"),
            ],
            system_prompt: None,
            sampling: (0.5, 1000),
        }),
    ]
}

fn automation_skills() -> Vec<Skill> {
    let readability = WorkflowSkill {
        parameters: vec![text_param("content", "Content to check")],
        ..WorkflowSkill::sequential(vec![
            prompt_step(
                "analyze",
                "Analyze text",
                "Analyze the readability of the following text, covering:\n\
                 1. Average sentence length\n2. Vocabulary difficulty\n\
                 3. Paragraph structure\n4. Suggested improvements\n\nText:\n{{content}}",
                (0.3, 500),
            ),
            prompt_step(
                "suggestions",
                "Write suggestions",
                "Based on the analysis below, give 3-5 concrete improvements.\n\n\
                 Analysis:\n{{analyze}}\n\nSuggestions:",
                (0.5, 300),
            )
            .depends_on(&["analyze"]),
        ])
    };

    let blog_post = WorkflowSkill {
        parameters: vec![SkillParameter::required(
            "topic",
            "Blog topic",
            ParameterType::String,
        )],
        ..WorkflowSkill::sequential(vec![
            prompt_step(
                "outline",
                "Outline",
                "Write a blog post outline for \"{{topic}}\" with an introduction, \
                 3-5 main sections and a conclusion.",
                (0.5, 500),
            ),
            prompt_step(
                "introduction",
                "Introduction",
                "Write an engaging introduction (about 150 words) for this outline:\n\n{{outline}}",
                (0.7, 200),
            )
            .depends_on(&["outline"]),
            prompt_step(
                "body",
                "Body",
                "Write the body of the post, about 200 words per section, following this \
                 outline:\n\n{{outline}}",
                (0.6, 1000),
            )
            .depends_on(&["outline"]),
            prompt_step(
                "conclusion",
                "Conclusion",
                "Write a closing conclusion (about 100 words) for this outline:\n\n{{outline}}",
                (0.5, 200),
            )
            .depends_on(&["outline"]),
        ])
    };

    let mut stats_mapping = Map::new();
    stats_mapping.insert("text".into(), Value::from("$content"));
    let text_stats = ToolSkill {
        tool: "text_stats".into(),
        parameter_mapping: stats_mapping,
        result_processing: Some(ResultProcessing {
            format: ResultFormat::Markdown,
            template: Some(
                "**Words:** {{words}}  \n**Characters:** {{characters}}  \n\
                 **Lines:** {{lines}}  \n**Paragraphs:** {{paragraphs}}"
                    .into(),
            ),
        }),
    };

    let digest = HybridSkill {
        skills: vec![
            SubSkillRef::new("skill-summarize"),
            SubSkillRef::new("skill-extract-keywords"),
        ],
        orchestration: Orchestration::default(),
        result_merge: Some(ResultMerge {
            strategy: MergeStrategy::Append,
            template: None,
        }),
    };

    vec![
        Skill::new(
            "skill-readability-check",
            "Readability Check",
            "Check readability and suggest improvements",
            SkillDefinition::Workflow(readability),
        )
        .with_category(SkillCategory::Automation)
        .with_tags(&["automation", "readability"]),
        Skill::new(
            "skill-blog-post",
            "Blog Post",
            "Generate a complete blog post from a topic",
            SkillDefinition::Workflow(blog_post),
        )
        .with_category(SkillCategory::Automation)
        .with_tags(&["automation", "blog"]),
        Skill::new(
            "skill-text-stats",
            "Text Statistics",
            "Count words, characters, lines and paragraphs",
            SkillDefinition::Tool(text_stats),
        )
        .with_category(SkillCategory::Automation)
        .with_tags(&["automation", "statistics"]),
        Skill::new(
            "skill-digest",
            "Digest",
            "Summary followed by keywords",
            SkillDefinition::Hybrid(digest),
        )
        .with_category(SkillCategory::Automation)
        .with_tags(&["automation", "summary", "keywords"]),
    ]
}

/// Every builtin skill, grouped by category.
pub fn builtin_skills() -> Vec<Skill> {
    let mut skills = writing_skills();
    skills.extend(editing_skills());
    skills.extend(analysis_skills());
    skills.extend(automation_skills());
    skills
}
