//! The single-page viewer UI.

const STYLE: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: 'Segoe UI', Arial, sans-serif; background: #1a1a2e; color: #e0e0e0; }
header {
    background: #16213e; padding: 14px 24px; display: flex; align-items: center;
    gap: 16px; border-bottom: 2px solid #0f3460; position: sticky; top: 0; z-index: 100;
}
header h1 { font-size: 1.2rem; color: #e94560; flex: 1; }
.nav-btn {
    padding: 6px 18px; border-radius: 6px; border: none; background: #0f3460;
    color: #e0e0e0; cursor: pointer; font-size: 0.9rem; transition: background 0.2s;
}
.nav-btn:hover { background: #e94560; }
.nav-btn:disabled { opacity: 0.3; cursor: default; }
#idx-display { font-size: 0.9rem; min-width: 120px; text-align: center; }
#jump-input {
    width: 70px; padding: 5px 8px; border-radius: 6px; border: 1px solid #0f3460;
    background: #16213e; color: #e0e0e0; font-size: 0.9rem;
}
.main { max-width: 1400px; margin: 24px auto; padding: 0 24px; }
.card {
    background: #16213e; border-radius: 12px; padding: 20px 24px;
    margin-bottom: 20px; border: 1px solid #0f3460;
}
.card h2 {
    font-size: 0.85rem; color: #e94560; text-transform: uppercase;
    letter-spacing: 1px; margin-bottom: 10px;
}
.meta-grid { display: flex; gap: 24px; flex-wrap: wrap; }
.meta-item label { font-size: 0.75rem; color: #888; display: block; }
.meta-item span { font-size: 0.95rem; color: #fff; font-weight: 600; }
.strip-wrap { overflow-x: auto; text-align: center; padding: 8px 0; }
.strip-wrap img {
    max-height: 400px; border-radius: 8px; border: 2px solid #0f3460; cursor: pointer;
}
.strip-wrap img:hover { border-color: #e94560; }
#lb {
    display: none; position: fixed; inset: 0; background: rgba(0,0,0,.85);
    z-index: 200; align-items: center; justify-content: center;
}
#lb.open { display: flex; }
#lb img { max-width: 95vw; max-height: 95vh; border-radius: 8px; }
#lb-close { position: fixed; top: 16px; right: 24px; font-size: 2rem; cursor: pointer; color: #fff; }
pre {
    white-space: pre-wrap; word-break: break-word; background: #0d1b2a; padding: 14px;
    border-radius: 8px; font-size: 0.82rem; line-height: 1.6; color: #b0c4de;
    max-height: 260px; overflow-y: auto;
}
#progress {
    height: 4px; background: #e94560; position: fixed; top: 0; left: 0;
    z-index: 200; transition: width 0.3s;
}
"#;

const SCRIPT: &str = r#"
let idx = 0;
const total = window.__TOTAL__;
const el = id => document.getElementById(id);

function updateProgress() {
    el('progress').style.width = ((idx + 1) / total * 100) + '%';
}

function load(i) {
    if (i < 0 || i >= total) return;
    idx = i;
    updateProgress();
    fetch('/record?idx=' + i)
        .then(r => r.json())
        .then(data => {
            el('idx-display').textContent = (i + 1) + ' / ' + total;
            el('custom-id').textContent = data.custom_id;
            el('model-id').textContent = data.model;
            if (data.image_b64) {
                el('strip-img').src = 'data:' + data.image_mime + ';base64,' + data.image_b64;
                el('strip-section').style.display = '';
            } else {
                el('strip-section').style.display = 'none';
            }
            el('user-text').textContent = data.user_text;
            el('system-text').textContent = data.system_text;
            el('jump-input').value = i + 1;
            el('btn-prev').disabled = (i === 0);
            el('btn-next').disabled = (i === total - 1);
        });
}

document.addEventListener('DOMContentLoaded', () => {
    load(0);
    el('btn-prev').onclick = () => load(idx - 1);
    el('btn-next').onclick = () => load(idx + 1);
    el('jump-input').addEventListener('change', e => {
        const v = parseInt(e.target.value, 10);
        if (!isNaN(v)) load(Math.max(0, Math.min(total - 1, v - 1)));
    });
    document.addEventListener('keydown', e => {
        if (e.target === el('jump-input')) return;
        if (e.key === 'ArrowRight' || e.key === 'ArrowDown') load(idx + 1);
        if (e.key === 'ArrowLeft' || e.key === 'ArrowUp') load(idx - 1);
        if (e.key === 'Escape') el('lb').classList.remove('open');
    });
    el('strip-img').onclick = () => {
        el('lb-img').src = el('strip-img').src;
        el('lb').classList.add('open');
    };
    el('lb-close').onclick = () => el('lb').classList.remove('open');
    el('lb').onclick = e => {
        if (e.target === el('lb')) el('lb').classList.remove('open');
    };
});
"#;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Batch Request Viewer</title>
<style>{{style}}</style>
</head>
<body>
<div id="progress"></div>
<div id="lb"><span id="lb-close">&times;</span><img id="lb-img" src="" alt="full size strip"></div>

<header>
  <h1>Batch Request Viewer</h1>
  <button class="nav-btn" id="btn-prev">&#9664; Prev</button>
  <span id="idx-display">- / {{total}}</span>
  <button class="nav-btn" id="btn-next">Next &#9654;</button>
  <input id="jump-input" type="number" min="1" max="{{total}}" title="Jump to record">
  <span style="font-size:0.8rem;color:#888">{{total}} records</span>
</header>

<div class="main">
  <div class="card">
    <h2>Request</h2>
    <div class="meta-grid">
      <div class="meta-item"><label>Custom ID</label><span id="custom-id">-</span></div>
      <div class="meta-item"><label>Model</label><span id="model-id">-</span></div>
    </div>
  </div>

  <div class="card" id="strip-section">
    <h2>Strip Image <small style="color:#888;font-size:0.75rem">(click to enlarge)</small></h2>
    <div class="strip-wrap"><img id="strip-img" src="" alt="strip"></div>
  </div>

  <div class="card">
    <h2>User Prompt</h2>
    <pre id="user-text"></pre>
  </div>

  <div class="card">
    <h2>System Prompt</h2>
    <pre id="system-text"></pre>
  </div>
</div>

<script>window.__TOTAL__ = {{total}};</script>
<script>{{script}}</script>
</body>
</html>
"#;

/// Render the viewer page for `total` records.
pub fn render_page(total: usize) -> String {
    TEMPLATE
        .replace("{{style}}", STYLE)
        .replace("{{script}}", SCRIPT)
        .replace("{{total}}", &total.to_string())
}
