//! Agent tree assembly

use super::agent::Agent;
use super::agent_tool::AgentTool;
use super::prompts;
use super::runner::AgentRunner;
use std::sync::Arc;
use wayfarer_tools::{Tool, ToolCategory, ToolRegistry};

/// State key holding the current draft
pub(crate) const GENERATED_RESPONSE_KEY: &str = "generated_response";
/// State key holding the latest critique
pub(crate) const CRITIQUE_FEEDBACK_KEY: &str = "critique_feedback";

/// The three agents the engine drives directly
#[derive(Debug, Clone)]
pub struct AgentTree {
    /// Produces the first draft, delegating to specialists
    pub orchestrator: Agent,
    /// Reviews a draft
    pub critic: Agent,
    /// Rewrites a draft from critique feedback
    pub refiner: Agent,
}

/// Assemble the travel agents from the tools in `registry`.
///
/// Specialists whose integration is not configured simply get no tools.
pub fn build_agent_tree(
    runner: &Arc<AgentRunner>,
    registry: &ToolRegistry,
    completion_phrase: &str,
) -> AgentTree {
    let as_tool = |agent: Agent| -> Arc<dyn Tool> { Arc::new(AgentTool::new(agent, runner.clone())) };

    let weather = Agent::new(
        "weather_agent",
        "Weather forecasts and air quality for a destination and dates",
        prompts::WEATHER,
    )
    .with_tools(registry.by_category(ToolCategory::Weather))
    .with_temperature(0.2);

    let inspiration = Agent::new(
        "inspiration_agent",
        "Destination ideas, points of interest and activities, with weather",
        prompts::INSPIRATION,
    )
    .with_tools(registry.by_category(ToolCategory::Places))
    .with_tools(registry.by_category(ToolCategory::Routes))
    .with_tools([as_tool(weather)]);

    let planning = planning_agent(runner, registry);

    let clarifying = Agent::new(
        "clarifying_agent",
        "Checks a trip request for missing details and returns questions or a summary",
        prompts::CLARIFYING,
    )
    .with_temperature(0.0);

    let orchestrator = Agent::new(
        "travel_orchestrator",
        "Routes travel requests to specialists and writes the answer",
        prompts::ORCHESTRATOR,
    )
    .with_tools([as_tool(clarifying), as_tool(inspiration), as_tool(planning)])
    .with_output_key(GENERATED_RESPONSE_KEY);

    let critic = Agent::new(
        "response_critic",
        "Reviews travel answers for quality and completeness",
        prompts::critic(completion_phrase),
    )
    .with_output_key(CRITIQUE_FEEDBACK_KEY);

    let refiner = Agent::new(
        "response_refiner",
        "Rewrites travel answers from review feedback",
        prompts::REFINER,
    )
    .with_output_key(GENERATED_RESPONSE_KEY);

    AgentTree {
        orchestrator,
        critic,
        refiner,
    }
}

/// Planning specialist with its flight, hotel, train and seat sub-agents
fn planning_agent(runner: &Arc<AgentRunner>, registry: &ToolRegistry) -> Agent {
    let as_tool = |agent: Agent| -> Arc<dyn Tool> { Arc::new(AgentTool::new(agent, runner.clone())) };

    let flights = Agent::new(
        "flight_agent",
        "Flight search, airport codes and fare confirmation",
        prompts::FLIGHTS,
    )
    .with_tools(registry.by_category(ToolCategory::Flights));

    let hotels = Agent::new("hotel_agent", "Hotel search for a city and stay dates", prompts::HOTELS)
        .with_tools(registry.by_category(ToolCategory::Hotels));

    let seats = Agent::new(
        "flight_seat_availability_agent",
        "Bookable seats per class on flights for a route and date",
        prompts::FLIGHT_SEATS,
    )
    .with_tools(registry.by_category(ToolCategory::FlightSeats));

    let trains = Agent::new(
        "train_agent",
        "Train search, running status and seat availability in India",
        prompts::TRAINS,
    )
    .with_tools(registry.by_category(ToolCategory::Rail));

    Agent::new(
        "planning_agent",
        "Concrete trip planning: flights, hotels, trains and routes",
        prompts::PLANNING,
    )
    .with_tools([as_tool(flights), as_tool(hotels), as_tool(trains), as_tool(seats)])
    .with_tools(registry.by_category(ToolCategory::Routes))
    .with_temperature(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wayfarer_llm::MockProvider;
    use wayfarer_tools::{ToolDefinition, ToolResult};

    fn names(agent: &Agent) -> Vec<String> {
        agent
            .tools
            .iter()
            .map(|t| t.definition().name.clone())
            .collect()
    }

    #[test]
    fn test_tree_shape() {
        let runner = Arc::new(AgentRunner::new(Arc::new(MockProvider::new())));
        let tree = build_agent_tree(&runner, &ToolRegistry::new(), "Done.");

        assert_eq!(
            names(&tree.orchestrator),
            vec!["clarifying_agent", "inspiration_agent", "planning_agent"]
        );
        assert_eq!(tree.orchestrator.output_key.as_deref(), Some("generated_response"));
        assert!(tree.critic.tools.is_empty());
        assert!(tree.critic.instruction.contains("Done."));
        assert_eq!(tree.refiner.output_key.as_deref(), Some("generated_response"));
    }

    struct NamedTool(ToolDefinition);

    #[async_trait::async_trait]
    impl Tool for NamedTool {
        fn definition(&self) -> &ToolDefinition {
            &self.0
        }

        async fn execute(&self, _input: Value) -> wayfarer_tools::Result<ToolResult> {
            Ok(ToolResult::success(Value::Null, 0))
        }
    }

    fn named(name: &str, category: ToolCategory) -> Arc<dyn Tool> {
        Arc::new(NamedTool(ToolDefinition::new(name, "test tool").with_category(category)))
    }

    #[test]
    fn test_planning_reaches_seat_and_day_trip_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(named("check_flight_availability", ToolCategory::FlightSeats));
        registry.register(named("optimize_day_trip", ToolCategory::Routes));
        let runner = Arc::new(AgentRunner::new(Arc::new(MockProvider::new())));

        let planning = planning_agent(&runner, &registry);
        assert_eq!(
            names(&planning),
            vec![
                "flight_agent",
                "hotel_agent",
                "train_agent",
                "flight_seat_availability_agent",
                "optimize_day_trip"
            ]
        );
    }
}
