// profile.rs - Analysis Profiles
// A profile bundles the instruction block, model and content labels used to
// compose the generation prompt. Handlers never branch on the profile; the
// composer just formats whatever profile it was given.

use log::debug;
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisProfile {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub article_label: String,
    pub video_label: String,
}

pub const DEFAULT_PROFILE: &str = "investor";

pub const PROFILE_NAMES: [&str; 2] = ["investor", "brief"];

const INVESTOR_INSTRUCTIONS: &str = r#"당신은 개인 투자자를 위한 경제 뉴스 해석 전문가입니다.
복잡한 뉴스를 투자 초보자도 이해할 수 있도록 쉽게 풀어주고,
실제 투자 판단에 도움이 되는 핵심 정보를 추출합니다.

[분석 규칙]
- 입력된 뉴스를 내부적으로 3회 압축 처리: 투자 관련 필터링 → 인과관계 구조화 → 핵심 판단 요소 추출. 이 과정은 사용자에게 보여주지 않고 최종 결과만 출력
- 전문 용어 사용 시 괄호 안에 쉬운 설명 필수 (예: 기준금리(한국은행이 정하는 이자율 기준))
- 친근한 말투 사용 (~거든요, ~란 말이에요, ~거예요)
- 확정적 표현("반드시 오릅니다") 절대 금지, 가능성과 시나리오로 표현 ("~할 가능성이 높아요")
- 개별 종목 추천 금지, 섹터와 방향성만 제시
- 카카오톡 메시지로 전달되므로 최대한 간결하게 작성. 불필요하게 길게 쓰지 말 것

[출력 형식 — 반드시 이 형식을 지켜주세요]

✅ 요약 (🟢긍정/🔴부정/🟡중립):
[핵심 내용 3~4문장. 누가 무엇을 왜 했는지, 시장에 어떤 영향인지]
━━━━━━━━━━━━━
💡 쉬운 해석:
[전문 용어 풀이 + 왜 중요한지 1~2문장]
━━━━━━━━━━━━━
🎯 대응 전략:
관련 섹터: [섹터명]
단기(1~2주): [행동]
중기(1~3개월): [행동]
✅ 지금 할 것: [딱 하나]
━━━━━━━━━━━━━
⚠️ 이 분석은 참고용이며, 투자의 최종 판단과 책임은 본인에게 있습니다.

[예외 처리]
- 경제/투자와 무관한 뉴스인 경우: "이 뉴스는 투자와 직접적인 관련이 낮아 보여요. 경제, 금융, 정책 관련 뉴스를 넣어주시면 분석해드릴게요!"
- 내용이 너무 짧아 분석이 어려운 경우: "기사 내용이 부족해요. 기사 전문을 넣어주시면 더 정확하게 분석해드릴 수 있어요!"

반드시 한국어로 답변하세요."#;

const BRIEF_INSTRUCTIONS: &str = r#"당신은 뉴스를 경제적 관점에서 해석하는 전문가입니다.

[규칙]
- 모든 분야의 뉴스를 받되, 경제/투자에 미치는 영향 중심으로 분석
- 전문 용어는 괄호 안에 쉬운 설명
- 친근한 말투 (~거든요, ~란 말이에요, ~거예요)
- 확정적 표현 금지, 가능성으로 표현
- 마크다운 절대 사용 금지. 일반 텍스트만 사용
- 최대한 짧게 작성. 각 섹션 사이에 빈 줄로 문단 구분

[출력 형식]

📰 (기사 원문 제목 그대로)

✅ 요약 (🟢긍정 / 🔴부정 / 🟡중립):
핵심 내용 3~4문장.

💡 쉬운 해석:
왜 중요한지 1~2문장만.

🏷️ 관련 섹터: (영향 받는 산업/섹터)

🤖 코멘트: (임팩트 있는 한줄)

반드시 한국어로 답변하세요."#;

impl AnalysisProfile {
    /// Looks up one of the built-in profiles by name (case-insensitive).
    pub fn builtin(name: &str) -> Option<Self> {
        let (model, instructions) = match name.trim().to_ascii_lowercase().as_str() {
            "investor" => ("gemini-2.5-flash", INVESTOR_INSTRUCTIONS),
            "brief" => ("gemini-2.0-flash", BRIEF_INSTRUCTIONS),
            _ => return None,
        };
        Some(Self {
            name: name.trim().to_ascii_lowercase(),
            model: model.to_string(),
            instructions: instructions.to_string(),
            article_label: "기사".to_string(),
            video_label: "영상".to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

/// Loads `{profile}_prompt.txt` with multi-path fallback, if one exists.
pub fn load_prompt_override(profile_name: &str) -> Option<String> {
    let file_name = format!("{}_prompt.txt", profile_name);
    let prompt_paths = [
        file_name.clone(),
        format!("../{}", file_name),
        format!("../../{}", file_name),
        format!("src/{}", file_name),
    ];

    for path in &prompt_paths {
        match fs::read_to_string(path) {
            Ok(content) => {
                // Remove BOM if present
                let content = content.strip_prefix('\u{feff}').unwrap_or(&content).trim();
                if content.is_empty() {
                    continue;
                }
                debug!("📄 Prompt for profile '{}' loaded from: {}", profile_name, path);
                return Some(content.to_string());
            }
            Err(_) => continue,
        }
    }

    debug!("📄 Using built-in prompt for profile '{}'", profile_name);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles() {
        for name in PROFILE_NAMES {
            let profile = AnalysisProfile::builtin(name).unwrap();
            assert_eq!(profile.name, name);
            assert!(profile.model.starts_with("gemini-"));
            assert!(profile.instructions.contains("반드시 한국어로 답변하세요."));
        }
        assert_eq!(AnalysisProfile::builtin(" Investor ").unwrap().name, "investor");
        assert!(AnalysisProfile::builtin("unknown").is_none());
    }

    #[test]
    fn test_profile_overrides() {
        let profile = AnalysisProfile::builtin(DEFAULT_PROFILE)
            .unwrap()
            .with_model("gemini-3.0-flash")
            .with_instructions("짧게 요약하세요.");
        assert_eq!(profile.model, "gemini-3.0-flash");
        assert_eq!(profile.instructions, "짧게 요약하세요.");
    }

    #[test]
    fn test_missing_prompt_override() {
        assert_eq!(load_prompt_override("no-such-profile-for-tests"), None);
    }
}
