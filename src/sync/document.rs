//! Configuration document builder
//!
//! Turns the declarative `config_parameters` tree into the flat
//! `{"system": {...}}` document `occ config:import` understands. The
//! translation is a fixed table of (option path, system key, transform).

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// How an option value becomes a system value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Copy,
    /// Lists are joined with `,`
    JoinComma,
    /// Lists are joined with a space
    JoinSpace,
    /// Doubled backslashes in class names are collapsed
    Unescape,
}

struct Mapping {
    path: &'static str,
    key: &'static str,
    transform: Transform,
    /// Emitted only when this option is `true`
    requires: Option<&'static str>,
}

const fn copy(path: &'static str, key: &'static str) -> Mapping {
    Mapping {
        path,
        key,
        transform: Transform::Copy,
        requires: None,
    }
}

const fn with(path: &'static str, key: &'static str, transform: Transform) -> Mapping {
    Mapping {
        path,
        key,
        transform,
        requires: None,
    }
}

const fn smtp_auth(path: &'static str, key: &'static str) -> Mapping {
    Mapping {
        path,
        key,
        transform: Transform::Copy,
        requires: Some("mail.auth.enabled"),
    }
}

#[rustfmt::skip]
const MAPPINGS: &[Mapping] = &[
    // localisation
    copy("language.default", "default_language"),
    copy("language.force", "force_language"),
    copy("locale.default", "default_locale"),
    copy("locale.force", "force_locale"),
    copy("phone_region", "default_phone_region"),
    with("defaultapps", "defaultapp", Transform::JoinComma),
    copy("knowledgebase_enabled", "knowledgebaseenabled"),
    copy("allow_user_to_change_display_name", "allow_user_to_change_display_name"),
    copy("remember_login_cookie_lifetime", "remember_login_cookie_lifetime"),
    // session and tokens
    copy("session.lifetime", "session_lifetime"),
    copy("session.relaxed_expiry", "session_relaxed_expiry"),
    copy("session.keepalive", "session_keepalive"),
    copy("auto_logout", "auto_logout"),
    copy("token.auth_enforced", "token_auth_enforced"),
    copy("token.auth_activity_update", "token_auth_activity_update"),
    copy("auth.bruteforce.protection.enabled", "auth.bruteforce.protection.enabled"),
    copy("auth.webauthn.enabled", "auth.webauthn.enabled"),
    copy("auth.storeCryptedPassword", "auth.storeCryptedPassword"),
    copy("hide_login_form", "hide_login_form"),
    // directories
    copy("skeleton_directory", "skeletondirectory"),
    copy("template_directory", "templatedirectory"),
    copy("temp_directory", "tempdirectory"),
    copy("update_directory", "updatedirectory"),
    copy("data_directory", "datadirectory"),
    copy("lost_password_link", "lost_password_link"),
    copy("logo_url", "logo_url"),
    // mail
    copy("mail.domain", "mail_domain"),
    copy("mail.from_address", "mail_from_address"),
    copy("mail.debug", "mail_smtpdebug"),
    copy("mail.mode", "mail_smtpmode"),
    copy("mail.hostname", "mail_smtphost"),
    copy("mail.port", "mail_smtpport"),
    copy("mail.timeout", "mail_smtptimeout"),
    copy("mail.secure", "mail_smtpsecure"),
    smtp_auth("mail.auth.enabled", "mail_smtpauth"),
    smtp_auth("mail.auth.username", "mail_smtpname"),
    smtp_auth("mail.auth.password", "mail_smtppassword"),
    with("mail.template_class", "mail_template_class", Transform::Unescape),
    copy("mail.send_plaintext_only", "mail_send_plaintext_only"),
    copy("mail.stream_options", "mail_smtpstreamoptions"),
    copy("mail.sendmailmode", "mail_sendmailmode"),
    // reverse proxy
    copy("proxy.overwrite.hostname", "overwritehost"),
    copy("proxy.overwrite.protocol", "overwriteprotocol"),
    copy("proxy.overwrite.web_root", "overwritewebroot"),
    copy("proxy.overwrite.cond_addr", "overwritecondaddr"),
    copy("proxy.overwrite.cli_url", "overwrite.cli.url"),
    copy("proxy.htaccess.rewrite_base", "htaccess.RewriteBase"),
    copy("proxy.htaccess.ignore_front_controller", "htaccess.IgnoreFrontController"),
    copy("proxy.proxy_name", "proxy"),
    copy("proxy.password", "proxyuserpwd"),
    copy("proxy.exclude", "proxyexclude"),
    copy("proxy.allow_local_remote_servers", "allow_local_remote_servers"),
    // retention
    copy("trashbin.retention_obligation", "trashbin_retention_obligation"),
    copy("versions.retention_obligation", "versions_retention_obligation"),
    // updates and checks
    copy("app_code_checker", "appcodechecker"),
    copy("update.checker", "updatechecker"),
    copy("update.server_url", "updater.server.url"),
    copy("update.release_channel", "updater.release.channel"),
    copy("has_internet_connection", "has_internet_connection"),
    copy("checks.connectivity_domains", "connectivity_check_domains"),
    copy("checks.working_wellknown_setup", "check_for_working_wellknown_setup"),
    copy("checks.working_htaccess", "check_for_working_htaccess"),
    copy("checks.data_directory_permissions", "check_data_directory_permissions"),
    copy("config_is_read_only", "config_is_read_only"),
    // logging
    copy("logging.type", "log_type"),
    copy("logging.type_audit", "log_type_audit"),
    copy("logging.file", "logfile"),
    copy("logging.logfile_audit", "logfile_audit"),
    copy("logging.filemode", "logfilemode"),
    copy("logging.level", "loglevel"),
    copy("logging.level_frontend", "loglevel_frontend"),
    copy("logging.syslog_tag", "syslog_tag"),
    copy("logging.syslog_tag_audit", "syslog_tag_audit"),
    copy("logging.condition", "log.condition"),
    copy("logging.dateformat", "logdateformat"),
    copy("logging.timezone", "logtimezone"),
    copy("logging.query", "log_query"),
    copy("logging.rotate_size", "log_rotate_size"),
    copy("profiler", "profiler"),
    // desktop and mobile clients
    copy("customclient.desktop", "customclient_desktop"),
    copy("customclient.android", "customclient_android"),
    copy("customclient.ios", "customclient_ios"),
    copy("customclient.ios_appid", "customclient_ios_appid"),
    // app store
    copy("apps.store.enabled", "appstoreenabled"),
    copy("apps.store.url", "appstoreurl"),
    copy("apps.allowlist", "appsallowlist"),
    copy("apps.paths", "apps_paths"),
    // previews
    copy("image_previews.enabled", "enable_previews"),
    copy("image_previews.concurrency.all", "preview_concurrency_all"),
    copy("image_previews.concurrency.new", "preview_concurrency_new"),
    copy("image_previews.max_x", "preview_max_x"),
    copy("image_previews.max_y", "preview_max_y"),
    copy("image_previews.max_filesize_image", "preview_max_filesize_image"),
    copy("image_previews.max_memory", "preview_max_memory"),
    copy("image_previews.libreoffice_path", "preview_libreoffice_path"),
    with("image_previews.office_cl_parameters", "preview_office_cl_parameters", Transform::JoinSpace),
    copy("image_previews.ffmpeg_path", "preview_ffmpeg_path"),
    copy("image_previews.imaginary_url", "preview_imaginary_url"),
    // caching
    copy("memcache.local", "memcache.local"),
    copy("memcache.distributed", "memcache.distributed"),
    copy("memcache.locking", "memcache.locking"),
    copy("memcache.servers", "memcached_servers"),
    copy("memcache.options", "memcached_options"),
];

/// The document handed to `occ config:import`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDocument {
    pub system: BTreeMap<String, Value>,
}

impl ConfigDocument {
    /// Build the document from an option tree and the trusted domains.
    ///
    /// Absent and `null` options are left out; every other value, `false`
    /// and `0` included, is carried over.
    pub fn build(parameters: &Value, trusted_domains: &[String]) -> Self {
        let mut system = BTreeMap::new();

        for mapping in MAPPINGS {
            if let Some(flag) = mapping.requires {
                if lookup(parameters, flag) != Some(&Value::Bool(true)) {
                    continue;
                }
            }
            let Some(value) = lookup(parameters, mapping.path) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            system.insert(mapping.key.to_string(), apply(mapping.transform, value));
        }

        if !trusted_domains.is_empty() {
            system.insert("trusted_domains".to_string(), Value::from(trusted_domains.to_vec()));
        }

        Self { system }
    }

    /// Pretty JSON with a trailing newline, the on-disk snapshot format
    pub fn render(&self) -> serde_json::Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

/// Follow a dotted path through nested objects
fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(tree, |node, part| node.get(part))
}

fn apply(transform: Transform, value: &Value) -> Value {
    match (transform, value) {
        (Transform::JoinComma, Value::Array(items)) => Value::String(join(items, ",")),
        (Transform::JoinSpace, Value::Array(items)) => Value::String(join(items, " ")),
        (Transform::Unescape, Value::String(s)) => Value::String(s.replace("\\\\", "\\")),
        _ => value.clone(),
    }
}

fn join(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_mapping() {
        let doc = ConfigDocument::build(
            &json!({
                "language": {"default": "de", "force": false},
                "phone_region": "DE",
                "defaultapps": ["dashboard", "files"],
                "session": {"lifetime": 86400, "keepalive": true},
                "auth": {"bruteforce": {"protection": {"enabled": true}}},
                "proxy": {"overwrite": {"cli_url": "https://cloud.example.org"}},
                "logging": {"level": 0, "condition": {"apps": ["admin_audit"]}},
            }),
            &["cloud.example.org".to_string()],
        );

        assert_eq!(doc.system["default_language"], "de");
        assert_eq!(doc.system["force_language"], false);
        assert_eq!(doc.system["default_phone_region"], "DE");
        assert_eq!(doc.system["defaultapp"], "dashboard,files");
        assert_eq!(doc.system["session_lifetime"], 86400);
        assert_eq!(doc.system["session_keepalive"], true);
        assert_eq!(doc.system["auth.bruteforce.protection.enabled"], true);
        assert_eq!(doc.system["overwrite.cli.url"], "https://cloud.example.org");
        assert_eq!(doc.system["loglevel"], 0);
        assert_eq!(doc.system["log.condition"], json!({"apps": ["admin_audit"]}));
        assert_eq!(doc.system["trusted_domains"], json!(["cloud.example.org"]));
        assert!(!doc.system.contains_key("session_relaxed_expiry"));
    }

    #[test]
    fn test_nulls_are_skipped() {
        let doc = ConfigDocument::build(&json!({"logo_url": null, "profiler": false}), &[]);
        assert!(!doc.system.contains_key("logo_url"));
        assert_eq!(doc.system["profiler"], false);
        assert!(!doc.system.contains_key("trusted_domains"));
    }

    #[test]
    fn test_smtp_credentials_only_when_auth_enabled() {
        let mail = |enabled: bool| {
            ConfigDocument::build(
                &json!({"mail": {
                    "mode": "smtp",
                    "auth": {"enabled": enabled, "username": "nc", "password": "secret"}
                }}),
                &[],
            )
        };

        let on = mail(true);
        assert_eq!(on.system["mail_smtpauth"], true);
        assert_eq!(on.system["mail_smtpname"], "nc");
        assert_eq!(on.system["mail_smtppassword"], "secret");

        let off = mail(false);
        assert_eq!(off.system["mail_smtpmode"], "smtp");
        assert!(!off.system.contains_key("mail_smtpauth"));
        assert!(!off.system.contains_key("mail_smtpname"));
        assert!(!off.system.contains_key("mail_smtppassword"));
    }

    #[test]
    fn test_transforms() {
        let doc = ConfigDocument::build(
            &json!({
                "mail": {"template_class": "\\\\OCA\\\\Theming\\\\Mail"},
                "image_previews": {
                    "office_cl_parameters": ["--headless", "--nologo"],
                    "max_memory": 256,
                    "imaginary_url": "http://imaginary:9000"
                },
            }),
            &[],
        );
        assert_eq!(doc.system["mail_template_class"], "\\OCA\\Theming\\Mail");
        assert_eq!(doc.system["preview_office_cl_parameters"], "--headless --nologo");
        assert_eq!(doc.system["preview_max_memory"], 256);
        assert_eq!(doc.system["preview_imaginary_url"], "http://imaginary:9000");
    }

    #[test]
    fn test_render_is_deterministic() {
        let params = json!({"profiler": true, "apps": {"store": {"enabled": false}}, "auto_logout": true});
        let a = ConfigDocument::build(&params, &[]).render().unwrap();
        let b = ConfigDocument::build(&params, &[]).render().unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with("}\n"));
        let keys: Vec<&str> = a
            .lines()
            .filter_map(|l| l.trim().strip_prefix('"'))
            .filter_map(|l| l.split('"').next())
            .collect();
        assert_eq!(keys, ["system", "appstoreenabled", "auto_logout", "profiler"]);
    }

    #[test]
    fn test_empty_parameters() {
        let doc = ConfigDocument::build(&Value::Null, &[]);
        assert!(doc.system.is_empty());
        assert_eq!(doc.render().unwrap(), "{\n  \"system\": {}\n}\n");
    }
}
