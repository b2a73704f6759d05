use crate::preset::Preset;

/// Builds the instruction sent to the model for one greeting.
pub fn build_prompt(preset: &Preset) -> String {
    format!(
        "Generate a creative greeting that says \"Hello World\" (or a fun variation like \"Hello Orld\") in {}. Keep it concise and engaging.",
        preset.prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::PresetRegistry;

    #[test]
    fn test_prompt_embeds_fragment() {
        let registry = PresetRegistry::builtin();
        let prompt = build_prompt(registry.get("scifi").unwrap());
        assert_eq!(
            prompt,
            "Generate a creative greeting that says \"Hello World\" (or a fun variation like \"Hello Orld\") in a futuristic, space-themed greeting. Keep it concise and engaging."
        );
    }
}
