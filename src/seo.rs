//! `robots.txt` and `sitemap.xml`. Both are rendered from fixed tables on each request.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use time::{macros::format_description, OffsetDateTime};

use crate::state::AppState;

/// Private areas crawlers must stay out of.
pub const DISALLOWED_PREFIXES: &[&str] = &[
    "/api/",
    "/students/",
    "/activities/",
    "/dashboard/",
    "/profile/",
    "/reset-password/",
];

pub struct SitemapEntry {
    pub path: &'static str,
    pub changefreq: &'static str,
    pub priority: f32,
}

pub const PUBLIC_PAGES: &[SitemapEntry] = &[
    SitemapEntry { path: "/", changefreq: "weekly", priority: 1.0 },
    SitemapEntry { path: "/about", changefreq: "monthly", priority: 0.8 },
    SitemapEntry { path: "/features", changefreq: "monthly", priority: 0.8 },
    SitemapEntry { path: "/pricing", changefreq: "monthly", priority: 0.7 },
    SitemapEntry { path: "/contact", changefreq: "yearly", priority: 0.5 },
    SitemapEntry { path: "/login", changefreq: "yearly", priority: 0.4 },
    SitemapEntry { path: "/register", changefreq: "yearly", priority: 0.4 },
];

pub fn is_disallowed(path: &str) -> bool {
    DISALLOWED_PREFIXES.iter().any(|prefix| {
        path.starts_with(prefix) || path == prefix.trim_end_matches('/')
    })
}

pub fn robots_txt(site_url: &str) -> String {
    let mut out = String::from("User-agent: *\nAllow: /\n");
    for prefix in DISALLOWED_PREFIXES {
        out.push_str("Disallow: ");
        out.push_str(prefix);
        out.push('\n');
    }
    out.push_str(&format!("\nSitemap: {site_url}/sitemap.xml\n"));
    out
}

pub fn sitemap_xml(site_url: &str, today: OffsetDateTime) -> String {
    let lastmod = today
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default();
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in PUBLIC_PAGES.iter().filter(|e| !is_disallowed(e.path)) {
        out.push_str(&format!(
            "  <url>\n    <loc>{site_url}{}</loc>\n    <lastmod>{lastmod}</lastmod>\n    \
             <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            entry.path, entry.changefreq, entry.priority
        ));
    }
    out.push_str("</urlset>\n");
    out
}

async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&state.config.site_url),
    )
}

async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        sitemap_xml(&state.config.site_url, OffsetDateTime::now_utc()),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/robots.txt", get(robots))
        .route("/sitemap.xml", get(sitemap))
}
