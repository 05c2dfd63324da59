//! The embedded single-page UI.
//!
//! One static HTML document with vanilla JS against the JSON endpoints —
//! enough surface for the workflow (upload → browse pages → extract →
//! review rules) without dragging a front-end toolchain into the crate.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Document Signing Rules Extractor</title>
<style>
  :root { --border: #d0d4da; --muted: #6b7280; --accent: #2563eb; --ok: #16a34a; --bad: #dc2626; }
  * { box-sizing: border-box; }
  body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #111827; }
  header { background: #fff; border-bottom: 1px solid var(--border); padding: 1rem 1.5rem; }
  header h1 { margin: 0; font-size: 1.25rem; }
  header p { margin: .25rem 0 0; color: var(--muted); font-size: .9rem; }
  main { display: grid; grid-template-columns: 280px 1fr; gap: 1rem; padding: 1rem 1.5rem; max-width: 1200px; margin: 0 auto; }
  .panel { background: #fff; border: 1px solid var(--border); border-radius: 8px; padding: 1rem; }
  .panel h2 { margin: 0 0 .75rem; font-size: 1rem; }
  label { display: block; font-size: .85rem; color: var(--muted); margin: .6rem 0 .2rem; }
  select, input[type=password], input[type=file] { width: 100%; padding: .45rem; border: 1px solid var(--border); border-radius: 6px; font-size: .9rem; }
  button { padding: .5rem .9rem; border: 1px solid var(--border); border-radius: 6px; background: #fff; cursor: pointer; font-size: .9rem; }
  button.primary { background: var(--accent); border-color: var(--accent); color: #fff; }
  button:disabled { opacity: .5; cursor: default; }
  #pager { display: flex; align-items: center; gap: .75rem; margin-bottom: .5rem; }
  #page-label { color: var(--muted); font-size: .9rem; }
  #page-text { width: 100%; height: 320px; font-family: ui-monospace, monospace; font-size: .8rem; border: 1px solid var(--border); border-radius: 6px; padding: .5rem; white-space: pre-wrap; overflow-y: auto; background: #fafafa; }
  .metrics { display: flex; gap: 1rem; margin: .75rem 0; }
  .metric { flex: 1; border: 1px solid var(--border); border-radius: 8px; padding: .6rem; text-align: center; }
  .metric .value { font-size: 1.4rem; font-weight: 600; }
  .metric .name { color: var(--muted); font-size: .8rem; }
  details { border: 1px solid var(--border); border-radius: 6px; padding: .4rem .6rem; margin: .4rem 0; }
  details summary { cursor: pointer; font-size: .9rem; }
  .approved { color: var(--ok); font-weight: 600; }
  .unapproved { color: var(--bad); font-weight: 600; }
  .rule-meta { color: var(--muted); font-size: .8rem; }
  #status { margin: .5rem 0; font-size: .9rem; }
  #status.error { color: var(--bad); }
  #status.ok { color: var(--ok); }
  .warn { color: #b45309; font-size: .85rem; }
  .hidden { display: none; }
</style>
</head>
<body>
<header>
  <h1>Document Signing Rules Extractor</h1>
  <p>Upload a PDF, browse its pages, and extract signing-rule checkboxes with a hosted LLM.</p>
</header>
<main>
  <aside class="panel">
    <h2>Configuration</h2>
    <label for="provider">AI provider</label>
    <select id="provider">
      <option value="claude">claude</option>
      <option value="gemini">gemini</option>
    </select>
    <label for="api-key">API key</label>
    <input type="password" id="api-key" placeholder="paste your key">
    <label for="file">PDF document</label>
    <input type="file" id="file" accept="application/pdf">
    <div style="margin-top: .8rem">
      <button id="upload" class="primary">Upload</button>
    </div>
    <div id="doc-info" class="rule-meta" style="margin-top:.8rem"></div>
  </aside>
  <section>
    <div class="panel" id="viewer-panel">
      <h2>Document viewer</h2>
      <div id="pager">
        <button id="prev" disabled>&#9664; Previous</button>
        <span id="page-label">No document loaded</span>
        <button id="next" disabled>Next &#9654;</button>
      </div>
      <div id="page-text"></div>
      <div style="margin-top:.8rem">
        <button id="extract" class="primary" disabled>&#128269; Extract Signing Rules</button>
      </div>
      <div id="status"></div>
    </div>
    <div class="panel hidden" id="results-panel">
      <h2>Extraction results</h2>
      <div class="metrics">
        <div class="metric"><div class="value" id="m-total">0</div><div class="name">Total rules</div></div>
        <div class="metric"><div class="value" id="m-approved">0</div><div class="name">Approved rules</div></div>
        <div class="metric"><div class="value" id="m-sections">0</div><div class="name">Sections found</div></div>
      </div>
      <div id="warnings"></div>
      <div id="sections"></div>
      <h2>Approved signing rules</h2>
      <div id="approved-rules"></div>
      <details>
        <summary>All rules summary</summary>
        <div id="all-rules"></div>
      </details>
    </div>
  </section>
</main>
<script>
const $ = (id) => document.getElementById(id);
const status = (msg, cls) => { const el = $("status"); el.textContent = msg; el.className = cls || ""; };
const esc = (s) => { const d = document.createElement("div"); d.textContent = s ?? ""; return d.innerHTML; };

async function api(path, opts) {
  const res = await fetch(path, opts);
  const body = await res.json();
  if (!res.ok) throw new Error(body.error || ("HTTP " + res.status));
  return body;
}

function renderPage(view) {
  $("page-label").textContent = `Page ${view.page} of ${view.total_pages}`;
  $("page-text").textContent = view.text || "(no text on this page)";
  $("prev").disabled = view.page <= 1;
  $("next").disabled = view.page >= view.total_pages;
  $("extract").disabled = false;
}

$("upload").onclick = async () => {
  const file = $("file").files[0];
  if (!file) { status("Choose a PDF file first", "error"); return; }
  const form = new FormData();
  form.append("file", file);
  status("Uploading…");
  try {
    const info = await api("/api/upload", { method: "POST", body: form });
    $("doc-info").textContent = `${info.filename} — ${info.page_count} pages, ${info.size_bytes.toLocaleString()} bytes`;
    renderPage(await api("/api/page"));
    $("results-panel").classList.add("hidden");
    status("Document loaded", "ok");
  } catch (e) { status(e.message, "error"); }
};

$("next").onclick = async () => { try { renderPage(await api("/api/page/next", { method: "POST" })); } catch (e) { status(e.message, "error"); } };
$("prev").onclick = async () => { try { renderPage(await api("/api/page/prev", { method: "POST" })); } catch (e) { status(e.message, "error"); } };

function ruleBlock(rule) {
  const verdict = rule.is_approved
    ? '<span class="approved">&#10004; APPROVED</span>'
    : '<span class="unapproved">&#10008; NOT APPROVED</span>';
  return `<details>
    <summary>Rule ${rule.rule_number}: ${esc(rule.rule_text.slice(0, 60))}${rule.rule_text.length > 60 ? "…" : ""}</summary>
    <p>${esc(rule.rule_text)}</p>
    <p class="rule-meta">Section: ${esc(rule.section || "N/A")} | Checkbox: <code>${esc(rule.checkbox_content)}</code> | ${verdict}</p>
  </details>`;
}

$("extract").onclick = async () => {
  const apiKey = $("api-key").value;
  if (!apiKey.trim()) { status("Please enter your API key", "error"); return; }
  $("extract").disabled = true;
  status("Analyzing document for signing rules…");
  try {
    const report = await api("/api/extract", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ provider: $("provider").value, api_key: apiKey }),
    });
    const r = report.result;
    if (r.status === "error") {
      status(r.message || "Extraction failed", "error");
      $("results-panel").classList.add("hidden");
      return;
    }
    status("Successfully processed document", "ok");
    $("m-total").textContent = r.total_rules;
    $("m-approved").textContent = r.approved_count;
    $("m-sections").textContent = r.sections_found.length;
    $("warnings").innerHTML = (report.warnings || [])
      .map((w) => `<p class="warn">&#9888; ${esc(w)}</p>`).join("");
    $("sections").innerHTML = r.sections_found
      .map((s) => `<p class="rule-meta">&#128205; <b>${esc(s.section_name)}</b> ${esc(s.section_number)} — ${esc(s.location)}</p>`).join("");
    $("approved-rules").innerHTML = r.approved_rules.length
      ? r.approved_rules.map(ruleBlock).join("")
      : '<p class="rule-meta">No approved rules detected.</p>';
    $("all-rules").innerHTML = r.all_rules.map(ruleBlock).join("");
    $("results-panel").classList.remove("hidden");
  } catch (e) {
    status(e.message, "error");
  } finally {
    $("extract").disabled = false;
  }
};
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_targets_every_endpoint() {
        for endpoint in [
            "/api/upload",
            "/api/page",
            "/api/page/next",
            "/api/page/prev",
            "/api/extract",
        ] {
            assert!(INDEX_HTML.contains(endpoint), "UI never calls {endpoint}");
        }
    }

    #[test]
    fn ui_offers_both_providers() {
        assert!(INDEX_HTML.contains("value=\"claude\""));
        assert!(INDEX_HTML.contains("value=\"gemini\""));
    }
}
