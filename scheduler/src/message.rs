use market::AssetQuote;

/// One line per asset:
/// `BTC price is: 25.00$, Diff: 25.00%`.
pub fn render_update(quotes: &[AssetQuote]) -> String {
    quotes
        .iter()
        .map(render_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_line(q: &AssetQuote) -> String {
    match q.deviation_pct() {
        Some(dev) => format!(
            "{} price is: {:.2}$, Diff: {:.2}%",
            q.asset.label(),
            q.price,
            dev
        ),
        None => format!(
            "{} price is: {:.2}$, median not available yet",
            q.asset.label(),
            q.price
        ),
    }
}

/// Reply for a median request.
pub fn render_medians(medians: &[(market::Asset, Option<f64>)]) -> String {
    medians
        .iter()
        .map(|(asset, median)| match median {
            Some(m) => format!("{} median: {:.2}$", asset.label(), m),
            None => format!("{} median: no samples yet", asset.label()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
