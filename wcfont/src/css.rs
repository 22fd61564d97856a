//! The stylesheet that points a page at its subset, and the script that
//! asks for it.

/// Where the routing layer serves artifacts from.
pub const DEFAULT_URL_PREFIX: &str = "/wcfont/fonts/";

/// Where the routing layer serves [`font_face_css`] for a family and text.
pub const CSS_PATH: &str = "/wcfont/css";

/// An `@font-face` rule for `file_name` under `url_prefix`.
pub fn font_face_css(family: &str, url_prefix: &str, file_name: &str) -> String {
    format!(
        "@font-face {{\n    font-family: \"{}\";\n    src: url({url_prefix}{file_name}) format(\"woff\");\n}}",
        escape(family)
    )
}

/// A script that gathers the text of every element matching `selector`,
/// links the stylesheet for that text and applies `family` to the elements.
///
/// Nothing is requested when the elements have no text.
pub fn loader_js(selector: &str, family: &str) -> String {
    let selector = js_string(selector);
    let family_param = js_string(family);
    let font_family = js_string(&format!("font-family:\"{}\"", escape(family)));
    format!(
        r#"var elems = document.querySelectorAll({selector});
var text = '';
for (var i = 0; i != elems.length; ++i) {{
  text += elems[i].textContent;
}}
if (text) {{
  var file = document.createElement('link');
  file.setAttribute('rel', 'stylesheet');
  file.setAttribute('type', 'text/css');
  file.setAttribute('href', '{css_path}?family=' + encodeURIComponent({family_param}) + '&content=' + encodeURIComponent(text));
  document.getElementsByTagName('head')[0].appendChild(file);
  for (i = 0; i != elems.length; ++i) {{
    elems[i].style.cssText = {font_family};
  }}
}}"#,
        css_path = CSS_PATH,
    )
}

/// A single quoted JavaScript string literal that is also safe inside an
/// inline `<script>`.
fn js_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '<' | '>' | '&' | '\u{2028}' | '\u{2029}' => {
                quoted.push_str(&format!("\\u{:04X}", c as u32))
            }
            c if c.is_control() => quoted.push_str(&format!("\\u{:04X}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// Backslash escape for a double quoted CSS string.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
