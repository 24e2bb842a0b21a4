/// Build the instruction sent to the chat backend for one conversion.
pub fn build_prompt(source_lang: &str, target_lang: &str, code: &str) -> String {
    format!(
        "Translate the following {source_lang} code to {target_lang}.\n\
         Return only the translated {target_lang} code, with no explanations.\n\
         Preserve identifiers and comments where possible.\n\n\
         {source_lang} code:\n\
         {code}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_both_languages_and_embeds_code() {
        let prompt = build_prompt("Python", "Rust", "print('hi')");
        assert!(prompt.starts_with("Translate the following Python code to Rust."));
        assert!(prompt.contains("Return only the translated Rust code"));
        assert!(prompt.contains("Preserve identifiers and comments"));
        assert!(prompt.ends_with("Python code:\nprint('hi')"));
    }

    #[test]
    fn code_is_embedded_verbatim() {
        let code = "  fn main() {\n\tlet x = \"{}\";\n}\n";
        assert!(build_prompt("Rust", "Go", code).contains(code));
    }
}
