use serde::Serialize;
use serde_json::{Value, json};

use pkgmux_backend::Context;
use pkgmux_core::Services;

use crate::cli::{
    CacheCommand, Command, ConfigCommand, PackageTarget, PackagesCommand, ProjectsCommand,
};
use crate::error::AppError;
use crate::settings::AppSettings;

fn to_json(value: impl Serialize) -> Result<Value, AppError> {
    Ok(serde_json::to_value(value)?)
}

fn done(action: &str, manager: Option<&str>) -> Value {
    json!({
        "status": "ok",
        "action": action,
        "manager": manager.unwrap_or("all"),
    })
}

/// Run one command and return what it should print.
pub async fn run(
    services: &Services,
    ctx: &Context,
    settings: &AppSettings,
    command: Command,
) -> Result<Value, AppError> {
    match command {
        Command::Managers => to_json(services.registry.statuses(ctx).await),
        Command::Cache(command) => cache(services, ctx, command).await,
        Command::Packages(command) => packages(services, ctx, command).await,
        Command::Config(command) => config(services, ctx, command).await,
        Command::Projects(command) => projects(services, ctx, settings, command).await,
    }
}

async fn cache(
    services: &Services,
    ctx: &Context,
    command: CacheCommand,
) -> Result<Value, AppError> {
    let cache = &services.cache;
    match command {
        CacheCommand::List => to_json(cache.all_cache_info(ctx).await?),
        CacheCommand::Show { manager } => to_json(cache.cache_info(ctx, &manager).await?),
        CacheCommand::Clear { manager: Some(manager) } => {
            cache.clear(ctx, &manager).await?;
            Ok(done("clear cache", Some(&manager)))
        }
        CacheCommand::Clear { manager: None } => {
            cache.clear_all(ctx).await?;
            Ok(done("clear cache", None))
        }
        CacheCommand::Size => Ok(json!({ "total_size": cache.total_size(ctx).await? })),
        CacheCommand::Summary => to_json(cache.summary(ctx).await?),
        CacheCommand::Stats => to_json(cache.stats(ctx).await?),
    }
}

async fn packages(
    services: &Services,
    ctx: &Context,
    command: PackagesCommand,
) -> Result<Value, AppError> {
    let packages = &services.packages;
    match command {
        PackagesCommand::List { path, manager: None } => {
            to_json(packages.all_packages(ctx, &path).await?)
        }
        PackagesCommand::List {
            path,
            manager: Some(manager),
        } => to_json(packages.packages_by_manager(ctx, &manager, &path).await?),
        PackagesCommand::Global { manager: None } => to_json(packages.global_packages(ctx).await?),
        PackagesCommand::Global {
            manager: Some(manager),
        } => to_json(packages.global_packages_by_manager(ctx, &manager).await?),
        PackagesCommand::Search { query } => to_json(packages.search(ctx, &query).await?),
        PackagesCommand::Info { name } => to_json(packages.package_info(ctx, &name).await?),
        PackagesCommand::Stats { global: true, .. } => to_json(packages.global_stats(ctx).await?),
        PackagesCommand::Stats { path, .. } => to_json(packages.stats(ctx, &path).await?),
        PackagesCommand::Install(PackageTarget {
            name,
            manager,
            global,
        }) => {
            packages.install(ctx, &name, &manager, global).await?;
            Ok(done("install", Some(&manager)))
        }
        PackagesCommand::Uninstall(PackageTarget {
            name,
            manager,
            global,
        }) => {
            packages.uninstall(ctx, &name, &manager, global).await?;
            Ok(done("uninstall", Some(&manager)))
        }
    }
}

async fn config(
    services: &Services,
    ctx: &Context,
    command: ConfigCommand,
) -> Result<Value, AppError> {
    let config = &services.config;
    match command {
        ConfigCommand::List => to_json(config.all_configs(ctx).await?),
        ConfigCommand::Show { manager } => to_json(config.config(ctx, &manager).await?),
        ConfigCommand::Summary => to_json(config.summary(ctx).await?),
        ConfigCommand::SetRegistry { url, manager } => {
            match manager.as_deref() {
                Some(manager) => config.set_registry(ctx, manager, &url).await?,
                None => config.set_registry_for_all(ctx, &url).await?,
            }
            Ok(done("set registry", manager.as_deref()))
        }
        ConfigCommand::SetProxy { url, manager } => {
            match manager.as_deref() {
                Some(manager) => config.set_proxy(ctx, manager, &url).await?,
                None => config.set_proxy_for_all(ctx, &url).await?,
            }
            Ok(done("set proxy", manager.as_deref()))
        }
        ConfigCommand::TestRegistry { url, manager } => {
            config.test_registry(&manager, &url)?;
            Ok(json!({ "manager": manager, "registry": url, "valid": true }))
        }
        ConfigCommand::TestProxy { url, manager } => {
            config.test_proxy(&manager, &url)?;
            Ok(json!({ "manager": manager, "proxy": url, "valid": true }))
        }
    }
}

async fn projects(
    services: &Services,
    ctx: &Context,
    settings: &AppSettings,
    command: ProjectsCommand,
) -> Result<Value, AppError> {
    let projects = &services.projects;
    let root_or_default =
        |root: Option<String>| root.unwrap_or_else(|| settings.default_scan_root.clone());
    match command {
        ProjectsCommand::Scan { root } => {
            to_json(projects.scan(ctx, &root_or_default(root)).await?)
        }
        ProjectsCommand::Analyze { path } => to_json(projects.analyze(ctx, &path).await?),
        ProjectsCommand::Deps { path } => to_json(projects.dependencies(&path).await?),
        ProjectsCommand::Stats { root } => {
            to_json(projects.stats(ctx, &root_or_default(root)).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pkgmux_backend::{BackendError, Context};
    use pkgmux_core::{BackendRegistry, Services};
    use serde_json::json;

    use super::run;
    use crate::cli::{CacheCommand, Command, ConfigCommand, ProjectsCommand};
    use crate::error::AppError;
    use crate::settings::AppSettings;

    fn empty_services() -> Services {
        Services::new(Arc::new(BackendRegistry::with_probe_timeout(
            Duration::from_millis(100),
        )))
    }

    #[tokio::test]
    async fn empty_registry_reports_nothing() {
        let services = empty_services();
        let ctx = Context::new();
        let settings = AppSettings::default();

        let managers = run(&services, &ctx, &settings, Command::Managers)
            .await
            .expect("managers listed");
        let size = run(&services, &ctx, &settings, Command::Cache(CacheCommand::Size))
            .await
            .expect("size computed");

        assert_eq!(managers, json!([]));
        assert_eq!(size, json!({ "total_size": 0 }));
    }

    #[tokio::test]
    async fn unknown_manager_is_a_backend_error() {
        let services = empty_services();
        let command = Command::Config(ConfigCommand::TestRegistry {
            url: "https://registry.npmjs.org/".to_string(),
            manager: "deno".to_string(),
        });

        let error = run(&services, &Context::new(), &AppSettings::default(), command)
            .await
            .expect_err("deno is not registered");

        assert!(matches!(
            error,
            AppError::Backend(BackendError::ManagerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn scan_falls_back_to_configured_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = AppSettings {
            default_scan_root: dir.path().to_string_lossy().into_owned(),
            ..AppSettings::default()
        };

        let projects = run(
            &empty_services(),
            &Context::new(),
            &settings,
            Command::Projects(ProjectsCommand::Scan { root: None }),
        )
        .await
        .expect("scan succeeds");

        assert_eq!(projects, json!([]));
    }

    #[tokio::test]
    async fn deps_reads_the_manifest() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("package.json"),
            r#"{ "name": "web", "version": "1.0.0", "dependencies": { "react": "18.2.0" } }"#,
        )
        .expect("write manifest");

        let tree = run(
            &empty_services(),
            &Context::new(),
            &AppSettings::default(),
            Command::Projects(ProjectsCommand::Deps {
                path: dir.path().to_path_buf(),
            }),
        )
        .await
        .expect("dependencies read");

        assert_eq!(tree["name"], "web");
        assert_eq!(tree["dependencies"][0]["name"], "react");
    }
}
