//! HTML page shell, print templates and readiness-gate scripts.
//!
//! Everything the browser sees that is not produced by the markup renderer
//! lives here, so page styling and the gate scripts can be inspected in unit
//! tests without launching Chromium.

/// CSS injected into the page shell: keep images inside the page and centred.
pub const PAGE_STYLE: &str = r#"
body { font-family: "Noto Serif", Georgia, serif; line-height: 1.5; margin: 0 auto; max-width: 100%; }
img, svg.image { max-width: 100%; height: auto; display: block; margin: 0 auto; }
.imageblock { text-align: center; page-break-inside: avoid; }
.imageblock .title { font-style: italic; }
pre, code { font-family: "Noto Sans Mono", Menlo, monospace; }
.listingblock pre { white-space: pre-wrap; word-wrap: break-word; }
"#;

/// MathJax configuration: `\(..\)` and `$..$` inline, `\[..\]` and `$$..$$`
/// display. Must run before the MathJax script itself.
pub const MATH_CONFIG: &str = r#"
window.MathJax = {
  tex: {
    inlineMath: [['\\(', '\\)'], ['$', '$']],
    displayMath: [['\\[', '\\]'], ['$$', '$$']]
  },
  svg: { fontCache: 'global' }
};
"#;

/// Print header: deliberately empty.
pub const HEADER_TEMPLATE: &str = "<span></span>";

/// Print footer: the page number, centred.
pub const FOOTER_TEMPLATE: &str = r#"<div style="font-size: 10px; width: 100%; text-align: center;"><span class="pageNumber"></span></div>"#;

/// Resolves `true` once MathJax is loaded and its typeset pass is done,
/// `false` if the global never shows up before `__DEADLINE_MS__`.
const MATH_READY_SCRIPT: &str = r#"
(async () => {
  const deadline = Date.now() + __DEADLINE_MS__;
  while (!(window.MathJax && window.MathJax.typesetPromise)) {
    if (Date.now() > deadline) { return false; }
    await new Promise((resolve) => setTimeout(resolve, 100));
  }
  if (window.MathJax.startup && window.MathJax.startup.promise) {
    await window.MathJax.startup.promise;
  }
  await window.MathJax.typesetPromise();
  return true;
})()
"#;

/// Resolves `{ total, failed }` once every `<img>` has loaded or errored.
pub const IMAGES_READY_SCRIPT: &str = r#"
(async () => {
  const images = Array.from(document.images);
  const settled = await Promise.all(images.map((img) => {
    if (img.complete) { return Promise.resolve(img.naturalWidth > 0); }
    return new Promise((resolve) => {
      img.addEventListener('load', () => resolve(true), { once: true });
      img.addEventListener('error', () => resolve(false), { once: true });
    });
  }));
  const failed = images.filter((_, i) => !settled[i]).map((img) => img.currentSrc || img.src);
  return { total: images.length, failed };
})()
"#;

/// Math gate script with its in-page deadline filled in.
pub fn math_ready_script(deadline_ms: u64) -> String {
    MATH_READY_SCRIPT.replace("__DEADLINE_MS__", &deadline_ms.to_string())
}

/// Wrap rendered body HTML in a complete page that loads the math script.
pub fn wrap_page(body_html: &str, title: &str, math_script_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script>{config}</script>
<script id="MathJax-script" async src="{src}"></script>
<style>{style}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = html_escape::encode_text(title),
        config = MATH_CONFIG,
        src = html_escape::encode_double_quoted_attribute(math_script_url),
        style = PAGE_STYLE,
        body = body_html,
    )
}
