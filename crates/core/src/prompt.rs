use crate::models::Intent;

/// Filled in by the dispatcher with the latest travel plan, if any.
pub const CONTEXT_PLACEHOLDER: &str = "{conversation_context}";

const GENERIC_ROLE: &str = "너는 도움이 되는 AI 여행 어시스턴트입니다.";

const OUTPUT_RULES: &str = "**중요: 출력 형식 규칙**
- 반드시 일반 한국어 텍스트로만 응답하세요
- JSON, XML, YAML 등의 구조화된 형식은 절대 사용하지 마세요
- action, action_input, output 같은 키워드는 사용하지 마세요
- 단순하고 명확한 문장으로 자연스럽게 답변하세요
- 마크다운 구조는 최소화하고 일반 텍스트 위주로 작성하세요";

struct RoleTemplate {
    role: &'static str,
    forbidden: &'static str,
    task: &'static str,
}

fn role_template(intent: Intent) -> Option<RoleTemplate> {
    let template = match intent {
        Intent::PlanTrip => RoleTemplate {
            role: "너는 여행 계획 전문가입니다.",
            forbidden: "**오직 여행 계획 생성만** 수행하세요. 캘린더 예약이나 공유는 하지 마세요.",
            task: "사용자가 요청하면 상세한 여행 일정을 만들어주세요.",
        },
        Intent::BookCalendar => RoleTemplate {
            role: "너는 캘린더 예약 전문가입니다.",
            forbidden: "**오직 캘린더 예약 기능만** 수행하세요. 새로운 여행 계획을 생성하지 마세요.",
            task: "이전에 생성된 여행 계획을 캘린더에 등록해주세요.",
        },
        Intent::SharePlan => RoleTemplate {
            role: "너는 공유 전문가입니다.",
            forbidden: "**오직 Gist 공유 기능만** 수행하세요. 여행 계획 생성이나 캘린더 예약은 하지 마세요.",
            task: "기존 여행 계획을 GitHub Gist로 저장해주세요.",
        },
        Intent::SearchPlace => RoleTemplate {
            role: "너는 장소 검색 전문가입니다.",
            forbidden: "**오직 장소 검색 기능만** 수행하세요. 전체 여행 계획을 생성하지 마세요.",
            task: "사용자가 요청한 장소나 정보를 찾아서 알려주세요.",
        },
        Intent::ManageEvent => RoleTemplate {
            role: "너는 일정 관리 전문가입니다.",
            forbidden: "**오직 기존 일정의 조회/수정/삭제만** 수행하세요. 새로운 계획은 생성하지 마세요.",
            task: "캘린더의 기존 일정을 관리해주세요.",
        },
        Intent::Other => return None,
    };
    Some(template)
}

pub fn role_section(intent: Intent) -> String {
    match role_template(intent) {
        Some(template) => format!("{}\n{}\n{}", template.role, template.forbidden, template.task),
        None => GENERIC_ROLE.to_string(),
    }
}

/// Builds the system instruction for an intent. The context placeholder is
/// left in place; tool names are rendered as plain names.
pub fn compose_system_prompt<S: AsRef<str>>(intent: Intent, tool_names: &[S]) -> String {
    let names = tool_names
        .iter()
        .map(|name| name.as_ref())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{role}\n\n{rules}\n\n**인텐트: {intent}**\n허용된 도구만 사용하고, 사용자가 명시적으로 요청하지 않은 추가 작업은 금지합니다.\n\n현재 대화 컨텍스트: {placeholder}\n사용 가능한 도구: [{names}]",
        role = role_section(intent),
        rules = OUTPUT_RULES,
        intent = intent,
        placeholder = CONTEXT_PLACEHOLDER,
        names = names,
    )
}

pub fn fill_context(prompt: &str, context: Option<&str>) -> String {
    prompt.replace(CONTEXT_PLACEHOLDER, context.unwrap_or("없음"))
}
