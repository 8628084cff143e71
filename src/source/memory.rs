//! In-memory fetcher and synthetic catalog pages for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use super::session::{Controls, Fetch};
use super::SourceError;
use crate::settings::Settings;

pub const BASE_URL: &str = "https://pokemondb.net/pokedex/";

pub struct MemoryFetcher {
    pages: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Register a page under `BASE_URL` + `slug`.
    pub fn with_slug(self, slug: &str, html: &str) -> Self {
        let url = format!("{}{}", BASE_URL, slug);
        self.with_page(&url, html)
    }
}

#[async_trait(?Send)]
impl Fetch for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, SourceError> {
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| SourceError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// Controls from the built-in settings.
pub fn controls() -> Controls {
    Settings::defaults().unwrap().locators.compile_controls().unwrap()
}

// ── Synthetic pages ──

#[derive(Debug, Clone)]
pub struct FormSpec {
    pub tab_label: String,
    pub index: String,
    pub types: Vec<String>,
    pub species: String,
    pub height: String,
    pub weight: String,
    /// Raw inner HTML of the abilities cell.
    pub abilities_html: String,
    pub stats: [i32; 6],
    pub total: i32,
}

impl FormSpec {
    pub fn new(label: &str, index: u32) -> Self {
        Self {
            tab_label: label.to_string(),
            index: format!("{:04}", index),
            types: vec!["Normal".to_string()],
            species: "Test Pokémon".to_string(),
            height: "1.0&nbsp;m (3′03″)".to_string(),
            weight: "10.0&nbsp;kg (22.0&nbsp;lbs)".to_string(),
            abilities_html: r#"<span class="text-muted">1. <a href="/ability/run-away">Run Away</a></span>"#
                .to_string(),
            stats: [50, 50, 50, 50, 50, 50],
            total: 300,
        }
    }

    pub fn types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn index_text(mut self, text: &str) -> Self {
        self.index = text.to_string();
        self
    }

    pub fn height(mut self, text: &str) -> Self {
        self.height = text.to_string();
        self
    }

    pub fn weight(mut self, text: &str) -> Self {
        self.weight = text.to_string();
        self
    }

    pub fn abilities(mut self, html: &str) -> Self {
        self.abilities_html = html.to_string();
        self
    }

    pub fn stats(mut self, stats: [i32; 6]) -> Self {
        self.stats = stats;
        self.total = stats.iter().fold(0i32, |acc, v| acc.saturating_add(*v));
        self
    }
}

/// Build a catalog page in the shape of a pokemondb.net entry: intro
/// paragraph, a tab list with one tab per form, one panel per form, and an
/// optional "next" link.
pub fn catalog_page(name: &str, generation: u32, forms: &[FormSpec], next_slug: Option<&str>) -> String {
    let tabs: String = forms
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let active = if i == 0 { " active" } else { "" };
            format!(
                r##"<a class="sv-tabs-tab{active}" href="#tab-basic-{n}">{label}</a>"##,
                n = i + 1,
                label = f.tab_label
            )
        })
        .collect();

    let panels: String = forms
        .iter()
        .enumerate()
        .map(|(i, f)| panel_html(i + 1, f))
        .collect();

    let nav = match next_slug {
        Some(slug) => format!(
            r#"<nav class="entity-nav component"><a class="entity-nav-next" rel="next" href="/pokedex/{slug}">Next</a></nav>"#
        ),
        None => r#"<nav class="entity-nav component"></nav>"#.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>{name} Pokédex</title></head>
<body>
<main class="main-content grid-container">
<h1>{name}</h1>
<div class="grid-row">
<div class="grid-col span-md-6 span-lg-8">
<p>{name} is a type Pokémon introduced in <abbr>Generation {generation}</abbr>.</p>
</div>
</div>
<div class="tabset-basics sv-tabs-wrapper">
<div class="sv-tabs-tab-list">{tabs}</div>
<div class="sv-tabs-panel-list">{panels}</div>
</div>
{nav}
</main>
</body>
</html>"#
    )
}

fn panel_html(n: usize, f: &FormSpec) -> String {
    let types: String = f
        .types
        .iter()
        .map(|t| format!(r#"<a class="type-icon" href="/type/{lc}">{t}</a> "#, lc = t.to_lowercase()))
        .collect();
    let names = ["HP", "Attack", "Defense", "Sp. Atk", "Sp. Def", "Speed"];
    let stat_rows: String = names
        .iter()
        .zip(f.stats.iter())
        .map(|(label, v)| {
            format!(
                r#"<tr><th>{label}</th><td class="cell-num">{v}</td><td class="cell-barchart"><div class="barchart-bar"></div></td><td class="cell-num">1</td><td class="cell-num">2</td></tr>"#
            )
        })
        .collect();

    format!(
        r#"<div class="sv-tabs-panel" id="tab-basic-{n}">
<div class="grid-row">
<div class="grid-col span-md-6 span-lg-4 text-center"><p><img src="x.jpg" alt=""></p></div>
<div class="grid-col span-md-6 span-lg-4">
<h2>Pokédex data</h2>
<table class="vitals-table"><tbody>
<tr><th>National №</th><td><strong>{index}</strong></td></tr>
<tr><th>Type</th><td>{types}</td></tr>
<tr><th>Species</th><td>{species}</td></tr>
<tr><th>Height</th><td>{height}</td></tr>
<tr><th>Weight</th><td>{weight}</td></tr>
<tr><th>Abilities</th><td>{abilities}</td></tr>
</tbody></table>
</div>
</div>
<div class="grid-row">
<div class="grid-col span-md-12 span-lg-8">
<div id="dex-stats"></div>
<h2>Base stats</h2>
<div class="resp-scroll">
<table class="vitals-table"><tbody>{stat_rows}</tbody>
<tfoot><tr><th>Total</th><td class="cell-num cell-total"><b>{total}</b></td><th class="cell-barchart"></th><th>Min</th><th>Max</th></tr></tfoot>
</table>
</div>
</div>
</div>
</div>"#,
        index = f.index,
        species = f.species,
        height = f.height,
        weight = f.weight,
        abilities = f.abilities_html,
        total = f.total,
    )
}
