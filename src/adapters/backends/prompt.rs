//! Prompt construction and response parsing shared by model-backed backends.

use crate::domain::codegen::{CommandContext, Role};

/// System prompt describing what the model should produce.
pub fn system_prompt(context: &CommandContext) -> String {
    let mut prompt = format!(
        "You are a code generator. {} Answer in {}",
        context.generation_mode().instruction(),
        context.target_language()
    );
    if !context.target_framework().is_empty() {
        prompt.push_str(&format!(" using {}", context.target_framework()));
    }
    prompt.push_str(". Put every code block in a fenced block tagged with its language.");

    if context.role() == Role::Learner {
        prompt.push_str(" Keep the code simple and comment non-obvious lines.");
    }
    if !context.keywords().is_empty() {
        prompt.push_str(&format!(" Relevant topics: {}.", context.keywords().join(", ")));
    }
    prompt
}

/// User message: the prompt plus any code the request operates on.
pub fn user_message(prompt: &str, context: &CommandContext) -> String {
    match context.existing_code() {
        Some(code) if !code.trim().is_empty() => format!(
            "{}\n\nExisting code:\n```{}\n{}\n```",
            prompt.trim(),
            context.target_language(),
            code.trim_end()
        ),
        _ => prompt.trim().to_string(),
    }
}

/// A code block pulled out of a model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag after the opening fence, if any.
    pub tag: Option<String>,
    pub code: String,
}

/// Parsed model answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedAnswer {
    /// First prose line before the first block.
    pub summary: String,
    pub blocks: Vec<CodeBlock>,
}

/// Splits a model answer into fenced code blocks.
///
/// An answer without fences is taken as a single untagged block. An
/// unterminated final fence still yields its content.
pub fn parse_answer(text: &str) -> ParsedAnswer {
    let mut parsed = ParsedAnswer::default();
    let mut current: Option<CodeBlock> = None;
    let mut saw_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            saw_fence = true;
            match current.take() {
                Some(block) => push_block(&mut parsed.blocks, block),
                None => {
                    let tag = rest.trim();
                    current = Some(CodeBlock {
                        tag: (!tag.is_empty()).then(|| tag.to_string()),
                        code: String::new(),
                    });
                }
            }
            continue;
        }

        match current.as_mut() {
            Some(block) => {
                block.code.push_str(line);
                block.code.push('\n');
            }
            None if parsed.summary.is_empty() && parsed.blocks.is_empty() => {
                parsed.summary = trimmed.trim_end().to_string();
            }
            None => {}
        }
    }

    if let Some(block) = current {
        push_block(&mut parsed.blocks, block);
    }

    if !saw_fence {
        let code = text.trim();
        parsed.summary.clear();
        if !code.is_empty() {
            parsed.blocks.push(CodeBlock {
                tag: None,
                code: format!("{}\n", code),
            });
        }
    }

    parsed
}

fn push_block(blocks: &mut Vec<CodeBlock>, block: CodeBlock) {
    if !block.code.trim().is_empty() {
        blocks.push(block);
    }
}
