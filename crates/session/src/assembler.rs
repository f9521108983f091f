//! Prompt assembly using the Llama-3 header delimiter scheme.

use chatrelay_core::turn::Turn;

/// Everything that feeds into one prompt.
pub struct AssemblyInput<'a> {
    /// Prior turns, oldest first.
    pub history: &'a [Turn],

    /// The new user question.
    pub user_text: &'a str,

    /// Rendered situational facts (clock, weather, ...).
    pub facts: &'a [String],
}

/// Builds the turn-delimited prompt sent to the generation service.
///
/// Deterministic: the same input always yields the same prompt. History is
/// emitted in the order given, never reordered or truncated here — the
/// caller owns windowing.
#[derive(Clone)]
pub struct ContextAssembler {
    system_instruction: String,
}

impl ContextAssembler {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
        }
    }

    pub fn assemble(&self, input: &AssemblyInput<'_>) -> String {
        let mut prompt = String::from("<|begin_of_text|>");

        let mut system = self.system_instruction.clone();
        if !input.facts.is_empty() {
            system.push_str("\n\n[Current context]\n");
            system.push_str(&input.facts.join("\n"));
        }
        push_segment(&mut prompt, "system", &system);

        for turn in input.history {
            push_segment(&mut prompt, "user", &turn.user_text);
            push_segment(&mut prompt, "assistant", &turn.ai_text);
        }
        push_segment(&mut prompt, "user", input.user_text);

        // Left open: generation continues from here
        prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
        prompt
    }
}

fn push_segment(prompt: &mut String, role: &str, text: &str) {
    prompt.push_str("<|start_header_id|>");
    prompt.push_str(role);
    prompt.push_str("<|end_header_id|>\n\n");
    prompt.push_str(text);
    prompt.push_str("<|eot_id|>");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str, ai: &str, sequence: i64) -> Turn {
        Turn::new("dev-1", user, ai, sequence)
    }

    #[test]
    fn empty_history_no_facts() {
        let assembler = ContextAssembler::new("Be brief.");
        let prompt = assembler.assemble(&AssemblyInput {
            history: &[],
            user_text: "안녕",
            facts: &[],
        });

        assert_eq!(
            prompt,
            "<|begin_of_text|>\
             <|start_header_id|>system<|end_header_id|>\n\nBe brief.<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\n안녕<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        );
    }

    #[test]
    fn facts_land_in_the_system_segment_only() {
        let assembler = ContextAssembler::new("Be brief.");
        let prompt = assembler.assemble(&AssemblyInput {
            history: &[],
            user_text: "날씨 어때?",
            facts: &["Current time: 2026-08-25 14:00".into(), "Seoul: clear, 27C".into()],
        });

        let system_end = prompt.find("<|eot_id|>").unwrap();
        let system = &prompt[..system_end];
        assert!(system.contains("[Current context]\nCurrent time: 2026-08-25 14:00\nSeoul: clear, 27C"));
        // Facts appear exactly once, inside the system segment
        assert_eq!(prompt.matches("[Current context]").count(), 1);
    }

    #[test]
    fn history_alternates_user_assistant_oldest_first() {
        let assembler = ContextAssembler::new("sys");
        let history = [turn("q1", "a1", 1), turn("q2", "a2", 2)];
        let prompt = assembler.assemble(&AssemblyInput {
            history: &history,
            user_text: "q3",
            facts: &[],
        });

        let q1 = prompt.find("q1").unwrap();
        let a1 = prompt.find("a1").unwrap();
        let q2 = prompt.find("q2").unwrap();
        let a2 = prompt.find("a2").unwrap();
        let q3 = prompt.find("q3").unwrap();
        assert!(q1 < a1 && a1 < q2 && q2 < a2 && a2 < q3);
        assert!(prompt.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let assembler = ContextAssembler::new("sys");
        let history = [turn("q", "a", 1)];
        let input = AssemblyInput {
            history: &history,
            user_text: "next",
            facts: &["fact".into()],
        };
        assert_eq!(assembler.assemble(&input), assembler.assemble(&input));
    }
}
