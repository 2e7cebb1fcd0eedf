use std::collections::BTreeMap;

use anyhow::Result;
use framestory_ml::story::TextGenerator;
use tracing::instrument;

pub const CLOSING_INSTRUCTION: &str = "\nNow write a compelling story that starts with the first frame, \
builds through the sequence, and concludes naturally, ensuring all events are connected and objects are consistent:";

/// Story prompt: instructions, then one `frame_id: description` line per
/// frame in lexical frame id order, then the closing instruction.
pub fn build_story_prompt(metadata: &BTreeMap<String, String>, story_prompt: &str) -> String {
    let mut prompt = format!("{story_prompt}\nFrame descriptions:\n");
    for (frame_id, description) in metadata {
        prompt.push_str(&format!("{frame_id}: {description}\n"));
    }
    prompt.push_str(CLOSING_INSTRUCTION);
    prompt
}

pub fn build_title_prompt(story: &str) -> String {
    format!(
        "Generate a concise, creative title (3-6 words) that vividly captures the main theme, \
         character dynamics, and emotional tone of the following story. Avoid generic words (e.g., 'adventure', 'tale'), \
         and ensure the title reflects the specific actions and relationships in the story:\n\n\
         {story}\n\nTitle:"
    )
}

#[instrument(level = "info", skip_all, fields(frames = metadata.len()))]
pub fn generate_story<G: TextGenerator + ?Sized>(
    generator: &mut G,
    metadata: &BTreeMap<String, String>,
    story_prompt: &str,
) -> Result<String> {
    let prompt = build_story_prompt(metadata, story_prompt);
    let story = generator.generate(&prompt)?;
    Ok(story.trim().to_string())
}

#[instrument(level = "info", skip_all)]
pub fn generate_title<G: TextGenerator + ?Sized>(generator: &mut G, story: &str) -> Result<String> {
    let title = generator.generate(&build_title_prompt(story))?;
    Ok(title.trim().replace('"', ""))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        prompts: Vec<String>,
        replies: VecDeque<String>,
    }

    impl TextGenerator for Recorder {
        fn generate(&mut self, prompt: &str) -> Result<String> {
            self.prompts.push(prompt.to_string());
            Ok(self.replies.pop_front().unwrap_or_default())
        }
    }

    fn dict(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn story_prompt_lists_frames_in_key_order() {
        let metadata = dict(&[("2", "a fox watches"), ("1", "a bird flies")]);
        let prompt = build_story_prompt(&metadata, "Write an engaging story");

        assert_eq!(
            prompt,
            format!(
                "Write an engaging story\nFrame descriptions:\n1: a bird flies\n2: a fox watches\n{CLOSING_INSTRUCTION}"
            )
        );
    }

    #[test]
    fn frame_keys_sort_as_strings() {
        let metadata = dict(&[("2", "second"), ("10", "tenth")]);
        let prompt = build_story_prompt(&metadata, "");
        let ten = prompt.find("10: tenth").unwrap();
        let two = prompt.find("2: second").unwrap();
        assert!(ten < two);
    }

    #[test]
    fn story_is_trimmed_generation_output() -> Result<()> {
        let mut generator = Recorder {
            replies: VecDeque::from(["  The bird flew; the fox watched.\n".to_string()]),
            ..Default::default()
        };
        let metadata = dict(&[("1", "a bird flies"), ("2", "a fox watches")]);

        let story = generate_story(&mut generator, &metadata, "Write an engaging story")?;

        assert_eq!(story, "The bird flew; the fox watched.");
        assert_eq!(generator.prompts.len(), 1);
        let prompt = &generator.prompts[0];
        let first = prompt.find("1: a bird flies").unwrap();
        let second = prompt.find("2: a fox watches").unwrap();
        assert!(first < second);
        assert!(prompt.ends_with(CLOSING_INSTRUCTION));
        Ok(())
    }

    #[test]
    fn title_drops_quotes_and_whitespace() -> Result<()> {
        let mut generator = Recorder {
            replies: VecDeque::from(["  \"The Fox's Patient Watch\" \n".to_string()]),
            ..Default::default()
        };

        let title = generate_title(&mut generator, "Once upon a time.")?;

        assert_eq!(title, "The Fox's Patient Watch");
        assert!(generator.prompts[0].contains("\n\nOnce upon a time.\n\nTitle:"));
        assert!(generator.prompts[0].contains("(3-6 words)"));
        Ok(())
    }
}
