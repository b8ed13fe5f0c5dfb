// Static HTML report: summary cards, one card per region/card type group

use std::path::Path;

use icpp_attribution::model::CategoryLine;
use icpp_attribution::rules::RuleTable;
use icpp_attribution::{AggregateRecord, AttributionConfig, AttributionReport, FeeCategory};

use crate::money::format_currency;

/// Tree lines smaller than this are left out.
const DISPLAY_EPSILON: f64 = 0.001;

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; background: #f4f5fb; color: #333; padding: 32px 16px; }
.container { max-width: 1400px; margin: 0 auto; }
.header { text-align: center; margin-bottom: 32px; }
.header h1 { font-size: 36px; color: #4c51bf; }
.header p { color: #666; margin-top: 6px; }
.stats-overview { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 16px; margin-bottom: 24px; }
.stat-card, .panel, .region-card { background: white; border-radius: 12px; box-shadow: 0 6px 20px rgba(0,0,0,0.08); padding: 20px; }
.stat-card { text-align: center; }
.stat-card h3 { font-size: 13px; text-transform: uppercase; color: #888; }
.stat-card .value { font-size: 32px; font-weight: 700; color: #4c51bf; margin-top: 6px; }
.panel { margin-bottom: 24px; }
.panel.warnings { border-left: 4px solid #dd6b20; }
.regions-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(420px, 1fr)); gap: 20px; }
.region-header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 12px; }
.region-name { font-size: 20px; font-weight: 600; }
.region-code { background: #ebf4ff; color: #4c51bf; border-radius: 6px; padding: 2px 8px; font-weight: 600; }
.region-stats { display: flex; gap: 24px; margin-bottom: 16px; }
.region-stat-label { font-size: 12px; color: #888; }
.region-stat-value { font-weight: 600; }
.fee-item { margin-bottom: 12px; }
.fee-header { display: flex; justify-content: space-between; }
.fee-percentage { color: #888; margin-left: 8px; }
.fee-badge { background: #fefcbf; color: #975a16; border-radius: 4px; padding: 1px 6px; font-size: 12px; margin-left: 6px; }
.fee-bar { background: #edf2f7; height: 6px; border-radius: 3px; margin-top: 4px; }
.fee-bar-fill { height: 6px; border-radius: 3px; }
.fee-bar-ic { background: #4299e1; }
.fee-bar-first { background: #9f7aea; }
.fee-bar-second { background: #ed8936; }
.fee-tree { margin: 8px 0 0 12px; font-size: 14px; }
.fee-tree-item { display: flex; justify-content: space-between; padding: 2px 0; }
.fee-tree-item.negative .fee-tree-amount { color: #c53030; }
.total-section { display: flex; justify-content: space-between; border-top: 1px solid #e2e8f0; padding-top: 10px; font-weight: 700; }
details { margin-top: 12px; font-size: 13px; color: #555; }
details p { margin-top: 4px; }
.footer { text-align: center; color: #888; margin-top: 32px; font-size: 13px; }
"#;

/// Escape text for element content and double-quoted attributes.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Bar width as a share of MDR, clamped to the bar.
fn bar_width(amount: f64, mdr: f64) -> f64 {
    if mdr.abs() > 0.0 {
        (amount.abs() / mdr.abs() * 100.0).min(100.0)
    } else {
        0.0
    }
}

pub fn render(report: &AttributionReport, config: &AttributionConfig) -> String {
    let rules = RuleTable::new(config.region_rules.clone());
    let s = &report.summary;
    let regions: std::collections::BTreeSet<&str> =
        report.groups.iter().map(|g| g.region.as_str()).collect();

    let mut html = String::new();
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>IC++ Pricing Breakdown - {name}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>IC++ Pricing Breakdown</h1>
<p>{name} &middot; generated {run_at}</p>
</div>
"#,
        name = escape(&report.meta.config_name),
        run_at = escape(&report.meta.run_at),
    ));

    html.push_str("<div class=\"stats-overview\">\n");
    for (label, value) in [
        ("Transactions in Ledger", s.total_transactions),
        ("Transactions Processed", s.total_processed),
        ("Transactions Skipped", s.total_skipped),
        ("Regions Analyzed", regions.len()),
    ] {
        html.push_str(&format!(
            "<div class=\"stat-card\"><h3>{label}</h3><div class=\"value\">{value}</div></div>\n"
        ));
    }
    html.push_str("</div>\n");

    if !s.skipped_by_reason.is_empty() {
        html.push_str("<div class=\"panel skipped\"><h3>Skipped Breakdown</h3><ul>\n");
        for (reason, count) in &s.skipped_by_reason {
            html.push_str(&format!("<li>{reason}: {count}</li>\n"));
        }
        html.push_str("</ul></div>\n");
    }

    if !report.warnings.is_empty() {
        html.push_str(&format!(
            "<div class=\"panel warnings\"><h3>&#9888; {} Warning(s)</h3><ul>\n",
            report.warnings.len()
        ));
        for warning in &report.warnings {
            html.push_str(&format!("<li>{}</li>\n", escape(&warning.to_string())));
        }
        html.push_str("</ul></div>\n");
    }

    html.push_str("<div class=\"regions-grid\">\n");
    for group in &report.groups {
        render_group(&mut html, group, config.region_name(&group.region), &rules);
    }
    html.push_str("</div>\n");

    html.push_str(&format!(
        "<div class=\"footer\"><p>icpp-attribution {}</p></div>\n</div>\n</body>\n</html>\n",
        escape(&report.meta.engine_version)
    ));
    html
}

fn fee_item(label: &str, badge: &str, amount: &str, pct: f64, bar_class: &str, width: f64) -> String {
    format!(
        r#"<div class="fee-item">
<div class="fee-header"><div class="fee-label">{label}{badge}</div><div class="fee-amount"><span class="fee-value">{amount}</span><span class="fee-percentage">{pct:.2}%</span></div></div>
<div class="fee-bar"><div class="fee-bar-fill {bar_class}" style="width: {width:.1}%"></div></div>
</div>
"#
    )
}

fn tree_item(line: &CategoryLine, currency: &str, last: bool) -> String {
    let icon = if last { "└─" } else { "├─" };
    let class = if line.total < 0.0 { "fee-tree-item negative" } else { "fee-tree-item" };
    format!(
        "<div class=\"{class}\"><div class=\"fee-tree-label\">{icon} {}</div><div class=\"fee-tree-amount\">{} ({:.3}%)</div></div>\n",
        escape(line.category.label()),
        escape(&format_currency(line.total, currency)),
        line.avg_pct
    )
}

fn render_group(html: &mut String, g: &AggregateRecord, region_name: &str, rules: &RuleTable) {
    let cur = g.currency.as_str();
    let money = |v: f64| escape(&format_currency(v, cur));
    let region_rules = rules.rules_for(&g.region);

    html.push_str(&format!(
        r#"<div class="region-card">
<div class="region-header"><span class="region-name">{}</span><span class="region-code">{}</span></div>
<div class="region-stats">
<div class="region-stat"><div class="region-stat-label">Volume</div><div class="region-stat-value">{}</div></div>
<div class="region-stat"><div class="region-stat-label">Transactions</div><div class="region-stat-value">{}</div></div>
<div class="region-stat"><div class="region-stat-label">Card Type</div><div class="region-stat-value">{}</div></div>
</div>
<div class="fee-breakdown">
"#,
        escape(region_name),
        escape(&g.region),
        money(g.total_volume),
        g.transaction_count,
        escape(&g.card_type),
    ));

    let badge: String = region_rules
        .iter()
        .map(|rule| format!("<span class=\"fee-badge\">&#9888; {rule}</span>"))
        .collect();
    let mdr = g.mdr.total;
    html.push_str(&fee_item(
        "IC (Interchange)",
        "",
        &money(g.interchange.total),
        g.interchange.avg_pct,
        "fee-bar-ic",
        bar_width(g.interchange.total, mdr),
    ));
    html.push_str(&fee_item(
        "1st Plus (Scheme)",
        &badge,
        &money(g.first_plus.total),
        g.first_plus.avg_pct,
        "fee-bar-first",
        bar_width(g.first_plus.total, mdr),
    ));
    html.push_str(&fee_item(
        "2nd Plus (Acquirer)",
        "",
        &money(g.second_plus.total),
        g.second_plus.avg_pct,
        "fee-bar-second",
        bar_width(g.second_plus.total, mdr),
    ));

    html.push_str("<div class=\"fee-tree\">\n");
    for line in g.breakdown.iter().filter(|l| l.category.is_itemized()) {
        if line.total.abs() > DISPLAY_EPSILON {
            html.push_str(&tree_item(line, cur, false));
        }
    }
    if let Some(markup) = g.line(FeeCategory::NetAcquirerMarkup) {
        html.push_str(&tree_item(markup, cur, true));
    }
    html.push_str("</div>\n</div>\n");

    html.push_str(&format!(
        "<div class=\"total-section\"><div class=\"total-label\">Total MDR</div><div class=\"total-value\">{} ({:.2}%)</div></div>\n",
        money(mdr),
        g.mdr.avg_pct
    ));

    html.push_str("<details><summary>Calculation details</summary>\n");
    html.push_str(&format!(
        "<p>2nd Plus = MDR &minus; IC &minus; 1st Plus = {} &minus; {} &minus; {} = {}</p>\n",
        money(mdr),
        money(g.interchange.total),
        money(g.first_plus.total),
        money(g.second_plus.total)
    ));
    html.push_str(&format!(
        "<p>Net Acquirer Markup = 2nd Plus &minus; itemized fees = {}</p>\n",
        money(g.net_acquirer_markup())
    ));
    if !region_rules.is_empty() {
        html.push_str(&format!(
            "<p>{} applies in {}: the scheme fee is not charged, so 2nd Plus = MDR &minus; IC and the markup absorbs it.</p>\n",
            region_rules.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", "),
            escape(region_name)
        ));
    }
    if g.negative_markup_count > 0 {
        html.push_str(&format!(
            "<p>{} transaction(s) have a negative net acquirer markup.</p>\n",
            g.negative_markup_count
        ));
    }
    html.push_str("</details>\n</div>\n");
}

/// Write the HTML report to `path`.
pub fn export(report: &AttributionReport, config: &AttributionConfig, path: &Path) -> Result<(), String> {
    std::fs::write(path, render(report, config))
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    log::info!("wrote HTML report for {} group(s) to {}", report.groups.len(), path.display());
    Ok(())
}
