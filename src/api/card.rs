//! Agent card served for discovery

use serde::Serialize;

pub const SUPPORTED_CONTENT_TYPES: [&str; 2] = ["text", "text/plain"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl AgentCard {
    /// Card for a server reachable at `host:port`
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            name: "Calculator & Greeting Agent".to_string(),
            description: "A helpful assistant that can greet people and perform basic arithmetic calculations"
                .to_string(),
            url: format!("http://{host}:{port}/"),
            version: "1.0.0".to_string(),
            default_input_modes: strings(&SUPPORTED_CONTENT_TYPES),
            default_output_modes: strings(&SUPPORTED_CONTENT_TYPES),
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: false,
            },
            skills: vec![calculator_skill(), greeting_skill()],
        }
    }
}

fn calculator_skill() -> AgentSkill {
    AgentSkill {
        id: "calculator".to_string(),
        name: "Calculator".to_string(),
        description: "Performs basic arithmetic operations: add, subtract, multiply, and divide"
            .to_string(),
        tags: strings(&["calculator", "math", "arithmetic"]),
        examples: strings(&[
            "What is 25 plus 17?",
            "Calculate 8 times 9",
            "Divide 144 by 12",
            "Add 10 and 5, then multiply the result by 3",
        ]),
    }
}

fn greeting_skill() -> AgentSkill {
    AgentSkill {
        id: "greeting".to_string(),
        name: "Greeting Generator".to_string(),
        description: "Generates friendly personalized greetings".to_string(),
        tags: strings(&["greeting", "hello", "introduction"]),
        examples: strings(&["Hi, my name is Alice!", "Say hello to Bob", "Greet John"]),
    }
}
