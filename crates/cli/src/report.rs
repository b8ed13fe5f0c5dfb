//! Console rendering of an attribution report.

use icpp_attribution::model::CategoryLine;
use icpp_attribution::rules::RuleTable;
use icpp_attribution::{AggregateRecord, AttributionConfig, AttributionReport, FeeCategory};
use icpp_io::money::format_currency;

const WIDTH: usize = 65;
/// Sub-category lines smaller than this are not printed.
const DISPLAY_EPSILON: f64 = 0.001;

pub fn render(report: &AttributionReport, config: &AttributionConfig) -> String {
    let rules = RuleTable::new(config.region_rules.clone());
    let heavy = "═".repeat(WIDTH);
    let s = &report.summary;

    let mut out = String::new();
    out.push_str(&format!("{heavy}\nIC++ PRICING BREAKDOWN ANALYSIS\n{heavy}\n"));
    out.push_str(&format!("Transactions in ledger:       {}\n", s.total_transactions));
    out.push_str(&format!("Total Transactions Processed: {}\n", s.total_processed));
    out.push_str(&format!("Transactions Skipped:         {}\n", s.total_skipped));
    if !s.skipped_by_reason.is_empty() {
        out.push_str("\nSkipped Breakdown:\n");
        for (reason, count) in &s.skipped_by_reason {
            out.push_str(&format!("  - {reason}: {count}\n"));
        }
    }
    if !report.warnings.is_empty() {
        out.push_str(&format!("\n⚠ {} WARNING(S):\n", report.warnings.len()));
        for w in &report.warnings {
            out.push_str(&format!("  - {w}\n"));
        }
    }
    out.push_str(&format!("{heavy}\n"));

    let mut current_region: Option<&str> = None;
    for group in &report.groups {
        if current_region != Some(group.region.as_str()) {
            current_region = Some(group.region.as_str());
            let name = config.region_name(&group.region).to_uppercase();
            out.push_str(&format!("\n\nREGION: {name} ({})\n", group.region));
            out.push_str(&format!("{}\n", "─".repeat(WIDTH)));
        }
        render_group(&mut out, group, &rules);
    }

    out.push_str(&format!("\n{heavy}\n"));
    out
}

fn layer_line(label: &str, amount: &str, pct: f64, suffix: &str) -> String {
    format!("    {label:<22} {amount:>15}  ({pct:.2}%){suffix}\n")
}

fn render_group(out: &mut String, g: &AggregateRecord, rules: &RuleTable) {
    let cur = g.currency.as_str();
    let money = |v: f64| format_currency(v, cur);

    out.push_str(&format!("\nCard Type: {}\n", g.card_type));
    out.push_str(&format!("  Count: {} | Volume: {}\n", g.transaction_count, money(g.total_volume)));
    out.push_str("\n  Fee Breakdown:\n");
    out.push_str(&layer_line("IC (Interchange):", &money(g.interchange.total), g.interchange.avg_pct, ""));

    let region_rules = rules.rules_for(&g.region);
    let marker = if region_rules.is_empty() {
        String::new()
    } else {
        let names: Vec<String> = region_rules.iter().map(|r| r.to_string()).collect();
        format!("  ⚠ {}", names.join(", "))
    };
    out.push_str(&layer_line("1st Plus (Scheme):", &money(g.first_plus.total), g.first_plus.avg_pct, &marker));
    out.push_str(&layer_line("2nd Plus (Acquirer):", &money(g.second_plus.total), g.second_plus.avg_pct, ""));

    out.push_str("      │\n      ├─ 2nd Plus Breakdown:\n");
    let component = |out: &mut String, line: &CategoryLine, indent: &str| {
        if line.total.abs() > DISPLAY_EPSILON {
            out.push_str(&format!(
                "{indent}├─ {:<26} {:>12}  ({:.3}%)\n",
                line.category.label(),
                money(line.total),
                line.avg_pct
            ));
        }
    };
    for line in g.breakdown.iter().filter(|l| l.category.is_itemized() && !l.category.is_tax()) {
        component(out, line, "      │  ");
    }
    if g.tax_total.total.abs() > DISPLAY_EPSILON {
        out.push_str("      │  ├─ Tax Components:\n");
        for line in g.breakdown.iter().filter(|l| l.category.is_tax()) {
            component(out, line, "      │  │  ");
        }
    }
    if let Some(markup) = g.line(FeeCategory::NetAcquirerMarkup) {
        let flag = if g.negative_markup_count > 0 {
            format!("  ⚠ {} negative", g.negative_markup_count)
        } else {
            String::new()
        };
        out.push_str(&format!(
            "      │  └─ {:<26} {:>12}  ({:.3}%){flag}\n",
            markup.category.label(),
            money(markup.total),
            markup.avg_pct
        ));
    }
    out.push_str("      │\n");

    out.push_str(&format!("    {}\n", "─".repeat(55)));
    out.push_str(&layer_line("Total MDR:", &money(g.mdr.total), g.mdr.avg_pct, ""));
}
