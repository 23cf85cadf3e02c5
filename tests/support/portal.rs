//! HTML fixtures and wiremock helpers that imitate the course portal.

use std::path::Path;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Course list page with one row per `(id, name)`.
#[must_use]
pub fn course_list_html(courses: &[(&str, &str)]) -> String {
    let rows: String = courses
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<tr class="course-list-table-row">
                     <td class="course-list-star-column"><span data-course-id="{id}"></span></td>
                     <td class="course-list-course-title-column"><a><span class="name">{name}</span></a></td>
                   </tr>"#
            )
        })
        .collect();
    format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
}

/// Modules page: each module has a name and `(title, href)` items.
#[must_use]
pub fn modules_html(modules: &[(&str, Vec<(&str, &str)>)]) -> String {
    let blocks: String = modules
        .iter()
        .map(|(name, items)| {
            let items: String = items
                .iter()
                .map(|(title, href)| {
                    format!(
                        r#"<li class="context_module_item"><a class="item_link" href="{href}">{title}</a></li>"#
                    )
                })
                .collect();
            format!(
                r#"<div class="item-group-condensed context_module"><span class="name">{name}</span><ul>{items}</ul></div>"#
            )
        })
        .collect();
    format!("<html><body>{blocks}</body></html>")
}

/// Item page carrying the portal's explicit download anchor.
#[must_use]
pub fn file_page_html(download_href: &str, file_name: &str) -> String {
    format!(
        r#"<html><body><h1>{file_name}</h1>
           <a href="/preview">Preview</a>
           <a download="true" href="{download_href}">Download {file_name}</a></body></html>"#
    )
}

/// Wiki-style page whose serialized body links one file.
#[must_use]
pub fn wiki_page_html(heading: &str, file_href: &str, link_text: &str) -> String {
    let body = format!(r#"<h2>{heading}</h2><p>See <a href="{file_href}">{link_text}</a>.</p>"#);
    let encoded = serde_json::to_string(&body).expect("body serializes");
    format!(
        r#"<html><head><script>ENV = {{"WIKI_PAGE":{{"title":"{heading}","body":{encoded}}}}};</script></head><body></body></html>"#
    )
}

/// Mounts a `200 text/html` GET route.
pub async fn mount_html(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

/// Mounts GET and HEAD for a file body. The GET route must be hit `expected_gets` times.
pub async fn mount_file(server: &MockServer, route: &str, body: &[u8], expected_gets: u64) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_gets)
        .named(route)
        .mount(server)
        .await;
}

/// Config JSON for a portal at `base_url` with everything stored under `root`.
#[must_use]
pub fn config_json(base_url: &str, root: &Path) -> String {
    serde_json::json!({
        "base_url": base_url,
        "download_dir": root.join("downloads"),
        "index_file": root.join("data").join("index.json"),
        "ledger_file": root.join("data").join("download_log.json"),
        "cookies_file": root.join("cookies.json"),
        "log_file": root.join("logs").join("run.log"),
        "static_settings": true,
        "always_reindex": false,
        "always_redownload": false,
    })
    .to_string()
}

/// Writes a one-cookie export next to the config.
pub fn write_cookies(root: &Path) {
    std::fs::write(root.join("cookies.json"), r#"{"_session_id": "abc123"}"#)
        .expect("write cookies");
}

/// Serves one response that declares `declared_len` bytes but closes the
/// connection after `sent`. Returns the URL to request.
pub async fn serve_truncated_body(declared_len: usize, sent: &'static [u8]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind truncated-body server");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(sent).await;
        let _ = socket.flush().await;
    });
    format!("http://{addr}/files/9/download?download_frd=1")
}
