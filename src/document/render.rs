use crate::document::model::{Document, Node, Paragraph, Run, Table};
use crate::domain::model::EmailDraft;

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn render_run(run: &Run) -> String {
    let mut html = escape_html(&run.text);
    if run.underline {
        html = format!("<u>{}</u>", html);
    }
    if run.italic {
        html = format!("<i>{}</i>", html);
    }
    if run.bold {
        html = format!("<b>{}</b>", html);
    }
    html
}

fn render_inline(paragraph: &Paragraph) -> String {
    paragraph.runs.iter().map(render_run).collect()
}

fn render_paragraph(paragraph: &Paragraph) -> String {
    if paragraph.is_empty() {
        "<p>&nbsp;</p>".to_string()
    } else {
        format!("<p>{}</p>", render_inline(paragraph))
    }
}

fn render_table(table: &Table) -> String {
    let mut html = String::from(
        "<table style=\"border-collapse: collapse; font-size: 10pt;\" border=\"1\" cellpadding=\"4\">\n",
    );
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            let mut style = Vec::new();
            if let Some(fill) = &cell.fill {
                style.push(format!("background-color: {}", escape_html(fill)));
            }
            if let Some(color) = &cell.color {
                style.push(format!("color: {}", escape_html(color)));
            }
            if style.is_empty() {
                html.push_str("<td>");
            } else {
                html.push_str(&format!("<td style=\"{}\">", style.join("; ")));
            }
            html.push_str(&render_inline(&cell.paragraph));
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

pub fn render_body(document: &Document) -> String {
    document
        .nodes
        .iter()
        .map(|node| match node {
            Node::Paragraph(paragraph) => render_paragraph(paragraph),
            Node::Table(table) => render_table(table),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 郵件草稿 HTML (以瀏覽器或郵件用戶端開啟後編輯/寄送)
pub fn render_html(draft: &EmailDraft) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(&draft.subject),
        render_body(&draft.body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Cursor, Emphasis};
    use crate::domain::ports::DocumentHost;

    #[test]
    fn test_render_emphasis_and_escaping() {
        let mut doc = Document::from_text("a <b> & c\n\nbold");
        let span = doc.find("bold", Cursor::default()).unwrap();
        doc.apply_emphasis(&span, Emphasis::Bold);

        let body = render_body(&doc);
        assert!(body.contains("<p>a &lt;b&gt; &amp; c</p>"));
        assert!(body.contains("<p>&nbsp;</p>"));
        assert!(body.contains("<p><b>bold</b></p>"));
    }

    #[test]
    fn test_render_html_has_subject() {
        let draft = EmailDraft {
            subject: "(週報)績效數字統計".to_string(),
            body: Document::from_text("Dear all,"),
        };
        let html = render_html(&draft);
        assert!(html.contains("<title>(週報)績效數字統計</title>"));
        assert!(html.contains("<p>Dear all,</p>"));
    }
}
