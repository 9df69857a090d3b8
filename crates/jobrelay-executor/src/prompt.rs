use jobrelay_types::{ContextData, Job, PromptProfile};

/// System prompt used when the caller does not supply a profile.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful senior software engineer working on an existing codebase. \
Follow these principles:\n\
- Make the smallest change that solves the problem.\n\
- Preserve existing behavior, public interfaces and code style unless asked otherwise.\n\
- Never delete code you do not understand.\n\
- Explain every change you make.\n\
- If the request is ambiguous, state your assumptions before editing.";

const CLOSING_INSTRUCTION: &str =
    "Provide the complete updated code and a short explanation of each change.";

/// Pick the system prompt for a request.
pub fn system_prompt_for(profile: Option<&PromptProfile>) -> &str {
    match profile {
        Some(p) => &p.system_prompt,
        None => DEFAULT_SYSTEM_PROMPT,
    }
}

/// Build the user message for a job.
pub fn build_prompt(job: &Job, context: &ContextData) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "# {} TASK\n\n",
        job.job_type.as_str().to_uppercase()
    ));

    if let Some(files) = context.files.as_ref().filter(|f| !f.is_empty()) {
        prompt.push_str(&format!("## Files to work on\n{}\n\n", files.join(", ")));
    }

    prompt.push_str(&format!("## Instructions\n{}\n\n", job.input_prompt));

    if let Some(code) = &context.current_code {
        prompt.push_str(&format!("## Current code\n```\n{code}\n```\n\n"));
    }

    prompt.push_str(CLOSING_INSTRUCTION);

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_prompt_minimal() {
        let job = Job::new("debug", "The login button does nothing");
        let prompt = build_prompt(&job, &ContextData::default());
        assert!(prompt.starts_with("# DEBUG TASK"));
        assert!(prompt.contains("## Instructions\nThe login button does nothing"));
        assert!(!prompt.contains("Files to work on"));
        assert!(!prompt.contains("```"));
        assert!(prompt.ends_with(CLOSING_INSTRUCTION));
    }

    #[test]
    fn test_build_prompt_files_and_code_order() {
        let job = Job::new("refactor", "Rename x");
        let ctx = ContextData {
            files: Some(vec!["a.ts".into(), "b.ts".into()]),
            current_code: Some("x=1".into()),
        };
        let prompt = build_prompt(&job, &ctx);

        let files_at = prompt.find("a.ts, b.ts").unwrap();
        let instructions_at = prompt.find("## Instructions").unwrap();
        let code_at = prompt.find("```\nx=1\n```").unwrap();
        assert!(files_at < instructions_at);
        assert!(instructions_at < code_at);
    }

    #[test]
    fn test_empty_files_list_is_skipped() {
        let job = Job::new("feature", "Add dark mode");
        let ctx = ContextData {
            files: Some(Vec::new()),
            current_code: None,
        };
        let prompt = build_prompt(&job, &ctx);
        assert!(!prompt.contains("Files to work on"));
    }

    #[test]
    fn test_custom_type_is_upper_cased() {
        let job = Job::new("perf-audit", "Find the slow query");
        let prompt = build_prompt(&job, &ContextData::default());
        assert!(prompt.starts_with("# PERF-AUDIT TASK"));
    }

    #[test]
    fn test_system_prompt_selection() {
        assert_eq!(system_prompt_for(None), DEFAULT_SYSTEM_PROMPT);
        let profile = PromptProfile::new("Answer in haiku.");
        assert_eq!(system_prompt_for(Some(&profile)), "Answer in haiku.");
    }

    proptest! {
        #[test]
        fn prop_prompt_contains_instructions_verbatim(input in "[ -~]{1,200}") {
            let job = Job::new("debug", input.clone());
            let prompt = build_prompt(&job, &ContextData::default());
            prop_assert!(prompt.contains(&input));
            prop_assert!(prompt.starts_with("# DEBUG TASK"));
        }

        #[test]
        fn prop_code_follows_instructions(code in "[a-z0-9=;]{1,40}") {
            let job = Job::new("feature", "do it");
            let ctx = ContextData { files: None, current_code: Some(code.clone()) };
            let prompt = build_prompt(&job, &ctx);
            let instructions_at = prompt.find("## Instructions").unwrap();
            let code_at = prompt.find(&format!("```\n{code}\n```")).unwrap();
            prop_assert!(instructions_at < code_at);
        }
    }
}
