//! Category taxonomy scraping.
//!
//! arXiv publishes its category taxonomy as an HTML page rather than an API;
//! this module scrapes it once into field/subcategory records, which become
//! the set of valid category ids offered for selection. Page structure: each
//! field is an `<h2 class="accordion-head">` heading whose accordion body
//! lists subcategories as `<h4>cs.AI <span>(Artificial Intelligence)</span></h4>`.

use crate::error::TaxonomyError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Taxonomy page URL
pub const TAXONOMY_URL: &str = "https://arxiv.org/category_taxonomy";

/// A top-level field (Computer Science, Mathematics, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryField {
    /// Field id, the prefix of its subcategory ids (e.g. `cs`)
    pub id: String,
    pub name: String,
    pub subcategories: Vec<Subcategory>,
}

/// A selectable subcategory within a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    /// Category id as used in feed queries (e.g. `cs.AI`)
    pub id: String,
    pub name: String,
}

/// Fetch and parse the category taxonomy.
pub async fn fetch_taxonomy(client: &reqwest::Client) -> Result<Vec<CategoryField>, TaxonomyError> {
    debug!(url = TAXONOMY_URL, "Fetching category taxonomy");
    let response = client.get(TAXONOMY_URL).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TaxonomyError::BadStatus(status.as_u16()));
    }

    let html = response.text().await?;
    let fields = parse_taxonomy(&html)?;
    info!(fields = fields.len(), "Loaded category taxonomy");
    Ok(fields)
}

/// Parse the taxonomy page markup.
pub fn parse_taxonomy(html: &str) -> Result<Vec<CategoryField>, TaxonomyError> {
    let document = Html::parse_document(html);

    let field_selector =
        Selector::parse("h2.accordion-head").map_err(|_| TaxonomyError::ParseFailed)?;
    let sub_selector = Selector::parse("h4").map_err(|_| TaxonomyError::ParseFailed)?;
    let name_selector = Selector::parse("span").map_err(|_| TaxonomyError::ParseFailed)?;

    let mut fields = Vec::new();

    for heading in document.select(&field_selector) {
        let field_name = heading.text().collect::<String>().trim().to_string();

        // Subcategories live in the accordion body that follows the heading.
        let Some(body) = heading.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };

        let mut subcategories = Vec::new();
        for entry in body.select(&sub_selector) {
            let id = entry
                .text()
                .next()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            let name = entry
                .select(&name_selector)
                .next()
                .map(|span| span.text().collect::<String>())
                .unwrap_or_default()
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .to_string();

            if !id.is_empty() && !name.is_empty() {
                subcategories.push(Subcategory { id, name });
            }
        }

        if subcategories.is_empty() {
            continue;
        }

        // Field id is the prefix of its first subcategory (e.g. `cs` for
        // `cs.AI`); fall back to the display name for dot-free ids.
        let field_id = subcategories[0]
            .id
            .split('.')
            .next()
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| field_name.clone());

        fields.push(CategoryField {
            id: field_id,
            name: field_name,
            subcategories,
        });
    }

    if fields.is_empty() {
        return Err(TaxonomyError::ParseFailed);
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<h2 class="accordion-head">Computer Science</h2>
<div class="accordion-body">
  <h4>cs.AI <span>(Artificial Intelligence)</span></h4>
  <h4>cs.CL <span>(Computation and Language)</span></h4>
</div>
<h2 class="accordion-head">Mathematics</h2>
<div class="accordion-body">
  <h4>math.CO <span>(Combinatorics)</span></h4>
</div>
</body></html>"#;

    #[test]
    fn test_parse_taxonomy_fields_and_subcategories() {
        let fields = parse_taxonomy(PAGE).unwrap();
        assert_eq!(fields.len(), 2);

        let cs = &fields[0];
        assert_eq!(cs.id, "cs");
        assert_eq!(cs.name, "Computer Science");
        assert_eq!(cs.subcategories.len(), 2);
        assert_eq!(cs.subcategories[0].id, "cs.AI");
        assert_eq!(cs.subcategories[0].name, "Artificial Intelligence");

        assert_eq!(fields[1].id, "math");
    }

    #[test]
    fn test_unrecognized_markup_fails() {
        assert!(parse_taxonomy("<html><body><p>maintenance</p></body></html>").is_err());
    }

    #[test]
    fn test_field_without_subcategories_is_skipped() {
        let page = r#"<html><body>
<h2 class="accordion-head">Empty Field</h2>
<div class="accordion-body"></div>
<h2 class="accordion-head">Physics</h2>
<div class="accordion-body"><h4>quant-ph <span>(Quantum Physics)</span></h4></div>
</body></html>"#;
        let fields = parse_taxonomy(page).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id, "quant-ph");
    }
}
