/// Single-pass line classifier for the narrative story body. The generation
/// prompt constrains output to `#`/`##` headings and prose, so nothing more
/// than that is recognized; unrecognized syntax stays literal text inside
/// whatever paragraph it falls into.
pub fn render(text: &str) -> String {
    let mut output: Vec<String> = Vec::new();
    let mut current_paragraph: Vec<String> = Vec::new();

    fn flush_paragraph(output: &mut Vec<String>, current_paragraph: &mut Vec<String>) {
        if !current_paragraph.is_empty() {
            output.push(format!("<p>{}</p>", current_paragraph.join(" ")));
            current_paragraph.clear();
        }
    }

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush_paragraph(&mut output, &mut current_paragraph);
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("## ") {
            flush_paragraph(&mut output, &mut current_paragraph);
            output.push(format!("<h2>{}</h2>", rest));
        } else if let Some(rest) = trimmed.strip_prefix("# ") {
            flush_paragraph(&mut output, &mut current_paragraph);
            output.push(format!("<h1>{}</h1>", rest));
        } else {
            current_paragraph.push(trimmed.to_string());
        }
    }

    flush_paragraph(&mut output, &mut current_paragraph);
    output.join("")
}
