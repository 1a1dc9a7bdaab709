//! Skill 读取与提示词组装服务
//!
//! 主 Prompt + 模块注入：
//! - 主 Prompt：`prompts/translator.md`（骨架、约束、Few-shot）
//! - 模块注入：`modules/roles/{role}.md`、`modules/rules/format-rules.md`
//!
//! classifier 直接返回 `prompts/classifier.md` 原文。

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::AppError;

/// 翻译器主 Prompt 的五个占位符
const PLACEHOLDER_SOURCE_ROLE: &str = "{{SOURCE_ROLE}}";
const PLACEHOLDER_TARGET_ROLE: &str = "{{TARGET_ROLE}}";
const PLACEHOLDER_SOURCE_CONTENT: &str = "{{SOURCE_ROLE_CONTENT}}";
const PLACEHOLDER_TARGET_CONTENT: &str = "{{TARGET_ROLE_CONTENT}}";
const PLACEHOLDER_FORMAT_RULES: &str = "{{FORMAT_RULES}}";

/// 读取并组装 Skill 提示词
///
/// - `classifier`: 返回分类器 Prompt 原文
/// - `translator`: 需要 `source_role` 与 `target_role`，组装后返回
/// - 其他 skill 不支持
pub fn read_skill(
    config: &Config,
    skill_name: &str,
    source_role: Option<&str>,
    target_role: Option<&str>,
) -> Result<String, AppError> {
    match skill_name {
        "classifier" => read_fragment(
            &config.prompts_dir().join("classifier.md"),
            "Classifier 文件不存在",
        ),
        "translator" => {
            let (source_role, target_role) = match (source_role, target_role) {
                (Some(source), Some(target)) => (source, target),
                _ => {
                    return Err(AppError::InvalidArgument(
                        "translator 需要指定 source_role 和 target_role".to_string(),
                    ))
                }
            };
            assemble_translator(config, source_role, target_role)
        }
        other => Err(AppError::UnsupportedSkill(other.to_string())),
    }
}

/// 组装翻译器提示词：主 Prompt + 角色片段 + 格式规则
fn assemble_translator(
    config: &Config,
    source_role: &str,
    target_role: &str,
) -> Result<String, AppError> {
    tracing::debug!(
        "[SKILL] 组装 translator: {} -> {}",
        source_role,
        target_role
    );

    let prompt = read_fragment(
        &config.prompts_dir().join("translator.md"),
        "主 Prompt 文件不存在: translator.md",
    )?;

    let roles_dir = config.modules_dir().join("roles");
    let source_content = read_fragment(
        &roles_dir.join(format!("{}.md", source_role)),
        &format!("角色文件不存在: {}", source_role),
    )?;
    let target_content = read_fragment(
        &roles_dir.join(format!("{}.md", target_role)),
        &format!("角色文件不存在: {}", target_role),
    )?;
    let format_rules = read_fragment(
        &config.modules_dir().join("rules").join("format-rules.md"),
        "规则文件不存在: format-rules.md",
    )?;

    // 占位符互不重叠，替换顺序无关
    let prompt = prompt
        .replace(PLACEHOLDER_SOURCE_ROLE, &source_role.to_uppercase())
        .replace(PLACEHOLDER_TARGET_ROLE, &target_role.to_uppercase())
        .replace(PLACEHOLDER_SOURCE_CONTENT, &source_content)
        .replace(PLACEHOLDER_TARGET_CONTENT, &target_content)
        .replace(PLACEHOLDER_FORMAT_RULES, &format_rules);

    Ok(prompt)
}

fn read_fragment(path: &Path, not_found_message: &str) -> Result<String, AppError> {
    if !path.is_file() {
        return Err(AppError::NotFound(not_found_message.to_string()));
    }
    fs::read_to_string(path).map_err(|e| {
        tracing::error!("[SKILL] 读取文件失败: {} - {}", path.display(), e);
        AppError::NotFound(not_found_message.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_context(dir: &Path) {
        let prompts = dir.join("prompts");
        let roles = dir.join("modules").join("roles");
        let rules = dir.join("modules").join("rules");
        fs::create_dir_all(&prompts).unwrap();
        fs::create_dir_all(&roles).unwrap();
        fs::create_dir_all(&rules).unwrap();

        fs::write(prompts.join("classifier.md"), "# 分类器\n输出 JSON").unwrap();
        fs::write(
            prompts.join("translator.md"),
            "翻译方向: {{SOURCE_ROLE}} → {{TARGET_ROLE}}\n\n\
             ## 源角色\n{{SOURCE_ROLE_CONTENT}}\n\n\
             ## 目标角色\n{{TARGET_ROLE_CONTENT}}\n\n\
             ## 格式\n{{FORMAT_RULES}}\n",
        )
        .unwrap();
        fs::write(roles.join("pm.md"), "产品经理视角").unwrap();
        fs::write(roles.join("dev.md"), "开发视角").unwrap();
        fs::write(rules.join("format-rules.md"), "使用 Markdown").unwrap();
    }

    fn test_config(context_dir: PathBuf) -> Config {
        Config {
            llm_api_key: "sk-test".to_string(),
            llm_base_url: "https://api.example.com".to_string(),
            llm_model: "glm-4.6".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            debug: false,
            log_level: "info".to_string(),
            log_retention_days: 30,
            allow_origins: "*".to_string(),
            ai_context_dir: context_dir,
            logs_dir: PathBuf::from("./logs"),
        }
    }

    #[test]
    fn test_read_classifier_skill() {
        let dir = TempDir::new().unwrap();
        write_context(dir.path());
        let config = test_config(dir.path().to_path_buf());

        let prompt = read_skill(&config, "classifier", None, None).unwrap();
        assert_eq!(prompt, "# 分类器\n输出 JSON");
    }

    #[test]
    fn test_read_translator_skill_substitutes_all_placeholders() {
        let dir = TempDir::new().unwrap();
        write_context(dir.path());
        let config = test_config(dir.path().to_path_buf());

        let prompt = read_skill(&config, "translator", Some("pm"), Some("dev")).unwrap();

        assert!(!prompt.contains("{{"));
        assert!(prompt.contains("PM → DEV"));
        assert!(prompt.contains("产品经理视角"));
        assert!(prompt.contains("开发视角"));
        assert!(prompt.contains("使用 Markdown"));
    }

    #[test]
    fn test_read_translator_skill_deterministic() {
        let dir = TempDir::new().unwrap();
        write_context(dir.path());
        let config = test_config(dir.path().to_path_buf());

        let first = read_skill(&config, "translator", Some("pm"), Some("dev")).unwrap();
        let second = read_skill(&config, "translator", Some("pm"), Some("dev")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_translator_requires_roles() {
        let dir = TempDir::new().unwrap();
        write_context(dir.path());
        let config = test_config(dir.path().to_path_buf());

        let err = read_skill(&config, "translator", Some("pm"), None).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_role_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        write_context(dir.path());
        let config = test_config(dir.path().to_path_buf());

        let err = read_skill(&config, "translator", Some("pm"), Some("ghost")).unwrap_err();
        match err {
            AppError::NotFound(message) => assert!(message.contains("ghost")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_skill() {
        let dir = TempDir::new().unwrap();
        write_context(dir.path());
        let config = test_config(dir.path().to_path_buf());

        let err = read_skill(&config, "reviewer", None, None).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedSkill(_)));
    }
}
