//! HTML → typed-record parsing for listing cards and detail pages.
//!
//! Every extraction function degrades to a sentinel on a missing field rather
//! than raising: `"N/A"` for strings, `[]` for lists, `false` for bools. The
//! selector table below is the single source of truth for both parsing
//! functions; each selector is compiled once via a cached `OnceLock`.

use std::sync::OnceLock;

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use crate::domain::models::{normalize_company_name, JobDetail, JobSummary};
use crate::extractor::derived;

const SENTINEL: &str = "N/A";

macro_rules! cached_selector {
    ($name:ident, $css:expr) => {
        fn $name() -> &'static Selector {
            static SEL: OnceLock<Selector> = OnceLock::new();
            SEL.get_or_init(|| Selector::parse($css).expect("static selector is valid"))
        }
    };
}

// ---- listing card selectors ----
cached_selector!(sel_card, "div.base-search-card");
cached_selector!(sel_card_title, "h3.base-search-card__title");
cached_selector!(sel_card_company, "h4.base-search-card__subtitle a");
cached_selector!(sel_card_location, "span.job-search-card__location");
cached_selector!(sel_card_posted_time, "time.job-search-card__listdate");
cached_selector!(sel_card_url, "a.base-card__full-link");
cached_selector!(sel_card_benefits, "span.result-benefits__text");
cached_selector!(sel_card_entity_ref, "[data-entity-urn]");

// ---- detail page selectors ----
cached_selector!(sel_detail_title, "h1.top-card-layout__title");
cached_selector!(sel_detail_company, "a.topcard__org-name-link");
cached_selector!(sel_detail_location, "span.topcard__flavor--bullet");
cached_selector!(sel_detail_posted, "span.posted-time-ago__text");
cached_selector!(sel_detail_applicants, "span.num-applicants__caption");
cached_selector!(sel_detail_description, "div.description__text");
cached_selector!(sel_detail_criteria_item, "li.description__job-criteria-item");
cached_selector!(sel_detail_criteria_header, "h3.description__job-criteria-subheader");
cached_selector!(sel_detail_criteria_value, "span.description__job-criteria-text");
cached_selector!(sel_detail_easy_apply, "button.jobs-apply-button--top-card");

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn job_id_from_entity_urn(root: ElementRef) -> Option<String> {
    const MARKER: &str = "urn:li:jobPosting:";
    let attr_on = |el: ElementRef| -> Option<String> {
        el.value().attr("data-entity-urn").and_then(|urn| {
            urn.find(MARKER).map(|idx| urn[idx + MARKER.len()..].to_string())
        })
    };
    attr_on(root).or_else(|| {
        root.select(sel_card_entity_ref())
            .find_map(|descendant| attr_on(descendant))
    })
}

/// Parse every listing card out of a search-results page's HTML.
pub fn parse_search_results_page(html: &str) -> Vec<JobSummary> {
    let document = Html::parse_document(html);
    document
        .select(sel_card())
        .map(parse_search_card_element)
        .collect()
}

fn parse_search_card_element(card: ElementRef) -> JobSummary {
    let id = job_id_from_entity_urn(card).unwrap_or_else(|| SENTINEL.to_string());

    let title = card
        .select(sel_card_title())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    let company_el = card.select(sel_card_company()).next();
    let company = company_el
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());
    let company_url = company_el
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
        .unwrap_or_else(|| SENTINEL.to_string());

    let location = card
        .select(sel_card_location())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    let posted_el = card.select(sel_card_posted_time()).next();
    let posted_date = posted_el
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());
    let posted_date_iso = posted_el
        .and_then(|el| el.value().attr("datetime"))
        .map(str::to_string)
        .unwrap_or_else(|| SENTINEL.to_string());

    let url = card
        .select(sel_card_url())
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
        .unwrap_or_else(|| SENTINEL.to_string());

    let benefits_badge = card
        .select(sel_card_benefits())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    JobSummary {
        id,
        title,
        company,
        company_url,
        location,
        posted_date,
        posted_date_iso,
        url,
        benefits_badge,
    }
}

/// Parse a single detail page's HTML into a `JobDetail`, running every
/// derived-field extractor over the description text. Never raises; a
/// malformed page yields a record close to `JobDetail::sentinel`.
pub fn parse_job_detail_page(html: &str, job_id: &str) -> JobDetail {
    let document = Html::parse_document(html);

    let title = document
        .select(sel_detail_title())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    let company_el = document.select(sel_detail_company()).next();
    let company = company_el
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());
    let company_url = company_el
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
        .unwrap_or_else(|| SENTINEL.to_string());

    let location = document
        .select(sel_detail_location())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    let posted_date = document
        .select(sel_detail_posted())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    let number_of_applicants = document
        .select(sel_detail_applicants())
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SENTINEL.to_string());

    let raw_description = document
        .select(sel_detail_description())
        .next()
        .map(text_of)
        .unwrap_or_default();

    let mut employment_type = SENTINEL.to_string();
    let mut seniority_level = SENTINEL.to_string();
    let mut job_function = SENTINEL.to_string();
    let mut industries = SENTINEL.to_string();

    for item in document.select(sel_detail_criteria_item()) {
        let header = item
            .select(sel_detail_criteria_header())
            .next()
            .map(text_of)
            .unwrap_or_default()
            .to_lowercase();
        let value = item
            .select(sel_detail_criteria_value())
            .next()
            .map(text_of)
            .unwrap_or_default();
        if value.is_empty() {
            continue;
        }
        if header.contains("seniority") {
            seniority_level = value;
        } else if header.contains("employment") {
            employment_type = value;
        } else if header.contains("function") {
            job_function = value;
        } else if header.contains("industries") {
            industries = value;
        }
    }

    let easy_apply = document.select(sel_detail_easy_apply()).next().is_some();

    let salary = derived::extract_salary_structured(&raw_description);
    let remote_eligible = derived::extract_remote_eligibility(&raw_description);
    let visa_sponsorship = derived::extract_visa_sponsorship(&raw_description);
    let skills = derived::extract_skills(&raw_description);

    let now = Utc::now();

    JobDetail {
        id: job_id.to_string(),
        normalized_company_name: normalize_company_name(&company),
        title,
        company,
        location,
        posted_date,
        posted_date_iso: SENTINEL.to_string(),
        url: format!("{}/jobPosting/{}", crate::config::PORTAL_BASE_URL, job_id),
        company_url,
        salary_min: salary.min,
        salary_max: salary.max,
        salary_currency: salary.currency.to_string(),
        equity_offered: salary.equity_offered,
        remote_eligible,
        visa_sponsorship,
        skills,
        easy_apply,
        raw_description,
        employment_type,
        seniority_level,
        job_function,
        industries,
        number_of_applicants,
        benefits_badge: SENTINEL.to_string(),
        profile_id: None,
        scraped_at: now,
        last_seen: now,
    }
}
