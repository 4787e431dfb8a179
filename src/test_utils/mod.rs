//! Shared test fixtures and HTML builders, used by unit tests across the
//! parser, repository, and pipeline modules.

#[cfg(test)]
pub mod fixtures {
    use crate::domain::models::{JobDetail, NewProfile};
    use crate::repository::Store;

    /// In-memory store with the production schema-init path applied.
    pub async fn setup_test_store() -> Store {
        Store::open_in_memory().await.expect("failed to open in-memory test store")
    }

    pub fn sample_profile() -> NewProfile {
        NewProfile {
            name: "test-profile".into(),
            location: "Remote".into(),
            keywords: "Backend Engineer".into(),
            distance: 25,
            time_filter: "r86400".into(),
            refresh_interval: 3600,
            enabled: true,
        }
    }

    pub fn sample_job(id: &str) -> JobDetail {
        let mut job = JobDetail::sentinel(id);
        job.title = "Senior Backend Engineer".into();
        job.company = "Acme Corp".into();
        job.normalized_company_name = crate::domain::models::normalize_company_name(&job.company);
        job.location = "Remote".into();
        job.posted_date = "2 days ago".into();
        job.posted_date_iso = "2024-01-02".into();
        job.salary_min = Some(150_000.0);
        job.salary_max = Some(180_000.0);
        job.remote_eligible = true;
        job.skills = vec!["Python".into(), "AWS".into()];
        job
    }
}


/// HTML fixture builders mirroring the selector tables the parser targets.
#[cfg(test)]
pub mod mocks {
    /// A single `base-search-card` listing entry.
    pub fn listing_card_html(id: &str, title: &str, company: &str, location: &str) -> String {
        format!(
            r#"<div data-entity-urn="urn:li:jobPosting:{id}" class="base-search-card">
                <h3 class="base-search-card__title">{title}</h3>
                <h4 class="base-search-card__subtitle"><a href="https://example.com/company/{company}">{company}</a></h4>
                <span class="job-search-card__location">{location}</span>
                <time class="job-search-card__listdate" datetime="2024-01-02">2 days ago</time>
                <a class="base-card__full-link" href="https://example.com/jobPosting/{id}"></a>
            </div>"#
        )
    }

    /// A full search-results page wrapping `n` listing cards.
    pub fn search_results_page(cards: &[String]) -> String {
        format!(
            "<html><body><ul>{}</ul></body></html>",
            cards.iter().map(|c| format!("<li>{c}</li>")).collect::<String>()
        )
    }

    /// A detail page with the fixed criteria-item rows the parser routes by
    /// header keyword.
    pub fn detail_page_html(title: &str, company: &str, description: &str) -> String {
        format!(
            r#"<html><body>
                <h1 class="top-card-layout__title">{title}</h1>
                <a class="topcard__org-name-link" href="https://example.com/company">{company}</a>
                <span class="topcard__flavor--bullet">Remote</span>
                <span class="num-applicants__caption">25 applicants</span>
                <div class="description__text">{description}</div>
                <li class="description__job-criteria-item">
                    <h3 class="description__job-criteria-subheader">Seniority level</h3>
                    <span class="description__job-criteria-text">Mid-Senior level</span>
                </li>
                <li class="description__job-criteria-item">
                    <h3 class="description__job-criteria-subheader">Employment type</h3>
                    <span class="description__job-criteria-text">Full-time</span>
                </li>
            </body></html>"#
        )
    }
}
