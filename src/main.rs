//! Navix Core 命令行入口
//!
//! 用于检查配置、试验路由规则与合并路由清单。
//!
//! # 命令概览
//!
//! - `version` - 显示版本信息
//! - `check-config` - 验证配置文件
//! - `validate` - 用配置中的规则检查一个路由
//! - `routes` - 合并并打印路由清单
//!
//! # 使用示例
//!
//! ```bash
//! # 检查配置文件
//! navix-core check-config -c navix.yaml
//!
//! # 检查路由与参数
//! navix-core -c navix.yaml validate asset.viewer --param asset_id=42
//!
//! # 合并路由清单
//! navix-core routes --source core.yaml --source asset.json
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use navix_core::security::SecurityEngine;
use navix_core::{
    Logger, LoggerConfig, NavixConfig, Params, RouteId, RouteManifest, ValidationEngine,
};

/// Navix Core - 导航核心
#[derive(Parser)]
#[command(name = "navix-core")]
#[command(version, about = "多窗口应用的导航核心工具", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "navix.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 查看版本信息
    Version,

    /// 验证配置文件
    ///
    /// 检查配置文件是否有效，并显示解析后的配置内容。
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },

    /// 检查路由
    ///
    /// 依次执行校验规则与安全规则（不含 RBAC），报告第一个失败。
    Validate {
        /// 路由标识（格式: module.page）
        route: String,

        /// 导航参数（格式: key=value，可重复）
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// 合并路由清单
    ///
    /// 按顺序加载 JSON 或 YAML 清单，同名条目冲突时报错。
    Routes {
        /// 清单文件（可重复）
        #[arg(short, long = "source", required = true)]
        sources: Vec<PathBuf>,
    },
}

/// 解析 `key=value`，值按 JSON 解析，失败时当作字符串
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("参数格式应为 key=value: '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("参数名不能为空: '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// 加载配置文件，不存在时使用默认配置
fn load_config(path: &Path) -> Result<NavixConfig, Box<dyn std::error::Error>> {
    if path.exists() {
        let config = NavixConfig::from_file(path)?;
        info!("已加载配置文件: {}", path.display());
        Ok(config)
    } else {
        info!("配置文件不存在 ({})，使用默认配置", path.display());
        Ok(NavixConfig::default())
    }
}

/// 检查配置文件
fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("检查配置文件: {}", path.display());
    println!();

    if !path.exists() {
        println!("⚠️  警告: 配置文件不存在，将使用默认配置");
        println!();
        print_config(&NavixConfig::default());
        return Ok(());
    }

    match NavixConfig::from_file(path) {
        Ok(config) => {
            println!("✅ 配置文件有效！");
            println!();
            print_config(&config);
            Ok(())
        }
        Err(e) => {
            println!("❌ 配置文件无效: {e}");
            Err(Box::new(e))
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "是"
    } else {
        "否"
    }
}

fn print_config(config: &NavixConfig) {
    println!("配置内容:");
    println!("────────────────────────────────────────");
    println!("  [导航]");
    println!("    历史上限:       {}", config.navigation.max_history);
    println!("    启用校验:       {}", yes_no(config.navigation.enable_validation));
    println!("    启用安全检查:   {}", yes_no(config.navigation.enable_security));
    println!("    身份参数:       {}", config.navigation.identity_param);
    println!();
    println!("  [校验]");
    println!("    内置规则:       {}", yes_no(config.validation.use_default_rules));
    println!("    路由模式:       {:?}", config.validation.route_patterns);
    println!("    保留路由:       {:?}", config.validation.reserved_routes);
    println!("    参数规则:       {:?}", config.validation.parameter_rules);
    println!();
    println!("  [安全]");
    println!("    内置规则:       {}", yes_no(config.security.use_default_rules));
    println!("    阻止模式:       {:?}", config.security.blocked_patterns);
    println!("    模块白名单:     {:?}", config.security.allowed_modules);
    println!("    RBAC:           {}", yes_no(config.security.enable_rbac));
    println!("    RBAC 策略:      {:?}", config.security.permission_policy);
    println!();
    println!("  [限流]");
    if config.rate_limit.enabled {
        println!(
            "    {} 次 / {} 秒，维度 {:?}",
            config.rate_limit.max_requests, config.rate_limit.window_secs, config.rate_limit.scope
        );
    } else {
        println!("    未启用");
    }
    println!();
    println!("  [日志]");
    println!("    日志级别:       {}", config.logging.level);
    println!("    文件输出:       {}", yes_no(config.logging.file_output));
    println!("    JSON 格式:      {}", yes_no(config.logging.json_format));
    if !config.frameworks.is_empty() {
        println!();
        println!("  [框架适配器]");
        for (name, adapter) in &config.frameworks {
            println!("    {name}: {adapter}");
        }
    }
    println!("────────────────────────────────────────");
}

/// 检查一个路由
fn validate_route(
    config: &NavixConfig,
    route: &str,
    params: Vec<(String, Value)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let route = RouteId::from(route);
    let params: Params = params.into_iter().collect();
    debug!(route = %route, params = params.len(), "检查路由");

    let validation = ValidationEngine::from_config(&config.validation)?;
    let security = SecurityEngine::from_config(&config.security, &config.navigation.identity_param)?;

    println!("路由: {route}");
    let outcome = validation
        .validate(&route, &params)
        .and_then(|()| security.check_route(&route));
    match outcome {
        Ok(()) => {
            println!("✅ 通过");
            Ok(())
        }
        Err(e) => {
            println!("❌ [{}] {e}", e.error_code());
            Err(Box::new(e))
        }
    }
}

/// 合并并打印路由清单
fn show_routes(sources: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let manifests = sources
        .iter()
        .map(RouteManifest::from_file)
        .collect::<Result<Vec<_>, _>>()?;
    let merged = RouteManifest::merge("routes", manifests)?;

    println!();
    println!("路由清单 ({} 条)", merged.len());
    println!("═══════════════════════════════════════");
    for (name, route) in merged.iter() {
        println!("  {name:<24} {route}");
    }
    println!("═══════════════════════════════════════");
    Ok(())
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("Navix Core - 导航核心");
    println!("═══════════════════════════════════════");
    println!("  版本:             {}", navix_core::VERSION);
    println!();
    println!("构建信息:");
    println!("  目标平台:         {}", std::env::consts::ARCH);
    println!("  操作系统:         {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _guard = Logger::try_init(
        LoggerConfig::builder()
            .level(cli.log_level.as_str())
            .filter_directives(format!("navix_core={}", cli.log_level))
            .build(),
    );

    match cli.command {
        Commands::Version => print_version(),

        Commands::CheckConfig { file } => {
            let path = file.unwrap_or(cli.config);
            check_config(&path)?;
        }

        Commands::Validate { route, params } => {
            let config = load_config(&cli.config)?;
            validate_route(&config, &route, params)?;
        }

        Commands::Routes { sources } => show_routes(&sources)?,
    }

    Ok(())
}
