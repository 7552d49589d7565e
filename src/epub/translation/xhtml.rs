//! XHTML序列化
//!
//! HTML解析器产生的节点树按XHTML规则输出：空元素自闭合，文本和属性值转义。

use quick_xml::escape::{escape, partial_escape};
use scraper::ElementRef;
use scraper::node::Node;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// 序列化元素，`heading` 不为空时作为 `<h2>` 插入到第一个子节点之前
pub fn serialize_element(element: ElementRef<'_>, heading: Option<&str>) -> String {
    let mut out = String::new();
    write_element(element, heading, &mut out);
    out
}

/// 元素内全部文本
pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn write_element(element: ElementRef<'_>, heading: Option<&str>, out: &mut String) {
    let name = element.value().name();

    out.push('<');
    out.push_str(name);

    // 属性按名称排序，保证输出稳定
    let mut attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if let Some(heading) = heading {
        out.push_str("<h2>");
        out.push_str(&partial_escape(heading));
        out.push_str("</h2>");
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&partial_escape(&**text)),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    write_element(child_element, None, out);
                }
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(document: &'a Html, selector: &str) -> ElementRef<'a> {
        let selector = Selector::parse(selector).unwrap();
        document.select(&selector).next().unwrap()
    }

    #[test]
    fn test_void_elements_are_self_closed() {
        let document = Html::parse_document("<body><p>line one<br>line two</p><img src=\"a.png\"></body>");
        assert_eq!(
            serialize_element(first(&document, "p"), None),
            "<p>line one<br/>line two</p>"
        );
        assert_eq!(serialize_element(first(&document, "img"), None), "<img src=\"a.png\"/>");
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let document = Html::parse_document(
            "<body><p title=\"a &quot;b&quot;\">Fish &amp; chips &lt;3</p></body>",
        );
        assert_eq!(
            serialize_element(first(&document, "p"), None),
            "<p title=\"a &quot;b&quot;\">Fish &amp; chips &lt;3</p>"
        );

        let document = Html::parse_document("<body><abbr title=\"Lao's <Tao>\">Tao & 'Te'</abbr></body>");
        assert_eq!(
            serialize_element(first(&document, "abbr"), None),
            "<abbr title=\"Lao&apos;s &lt;Tao&gt;\">Tao &amp; 'Te'</abbr>"
        );
    }

    #[test]
    fn test_heading_injection_and_text() {
        let document = Html::parse_document("<body><section><p>Tao <em>Te</em></p></section></body>");
        let section = first(&document, "section");
        assert_eq!(
            serialize_element(section, Some("Notes")),
            "<section><h2>Notes</h2><p>Tao <em>Te</em></p></section>"
        );
        assert_eq!(text_content(section), "Tao Te");
    }
}
