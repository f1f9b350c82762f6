use crate::error::MetricsError;
use circulca_schemas::{
    metrics::{BreakdownSource, DerivedMetrics, MaterialFlow, MetricValue, StageSeries},
    wire::{ReportRequest, ScenarioResult, SimulationResponse, StageImpact},
};
use tracing::{info, warn};

/// Share of a scenario total attributed to each stage when the service does
/// not report a breakdown: extraction, manufacturing, transport, end-of-life.
/// Both scenarios use the same weights.
pub const STAGE_WEIGHTS: [f64; 4] = [0.40, 0.35, 0.15, 0.10];

/// Illustrative virgin / recycled / loss split shown when the service omits
/// input percentages. Not computed from any data.
pub const PLACEHOLDER_FLOW: [f64; 3] = [60.0, 30.0, 10.0];

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Percentage CO₂ reduction of the circular scenario against the linear one,
/// to one decimal. Undefined against a zero (or non-finite) linear baseline.
pub fn co2_reduction(linear_co2: f64, circular_co2: f64) -> MetricValue {
    if linear_co2 == 0.0 || !linear_co2.is_finite() || !circular_co2.is_finite() {
        return MetricValue::Undefined;
    }
    let reduction = round_to((1.0 - circular_co2 / linear_co2) * 100.0, 1);
    if reduction.is_finite() {
        MetricValue::Defined(reduction)
    } else {
        MetricValue::Undefined
    }
}

/// Linear cost minus circular cost, to two decimals. Negative when the
/// circular scenario costs more.
pub fn cost_savings(linear_cost: f64, circular_cost: f64) -> MetricValue {
    MetricValue::from(Some(round_to(linear_cost - circular_cost, 2)))
}

/// Splits a scenario total across the four stages using [`STAGE_WEIGHTS`].
pub fn estimate_stages(total: f64) -> StageImpact {
    let [extraction, manufacturing, transport, end_of_life] = STAGE_WEIGHTS;
    StageImpact {
        extraction: total * extraction,
        manufacturing: total * manufacturing,
        transport: total * transport,
        end_of_life: total * end_of_life,
    }
}

/// Reported per-stage values for every evaluated scenario, or an estimate for
/// all of them. Mixing a reported series with an estimated one would make the
/// comparison meaningless, so one missing breakdown means all are estimated.
pub fn stage_series(linear: Option<&ScenarioResult>, circular: Option<&ScenarioResult>) -> StageSeries {
    let all_reported = [linear, circular]
        .into_iter()
        .flatten()
        .all(|scenario| scenario.stage_impact.is_some());
    if all_reported {
        StageSeries {
            linear: linear.and_then(|s| s.stage_impact),
            circular: circular.and_then(|s| s.stage_impact),
            source: BreakdownSource::Reported,
        }
    } else {
        StageSeries {
            linear: linear.map(|s| estimate_stages(s.co2_total_kg)),
            circular: circular.map(|s| estimate_stages(s.co2_total_kg)),
            source: BreakdownSource::Estimated,
        }
    }
}

/// Material-flow composition of the circular scenario.
pub fn material_flow(circular: Option<&ScenarioResult>) -> MaterialFlow {
    let reported = circular.and_then(|c| c.virgin_input_percent.zip(c.recycled_input_percent));
    match reported {
        Some((virgin, recycled)) if virgin.is_finite() && recycled.is_finite() => MaterialFlow {
            virgin_percent: virgin,
            recycled_percent: recycled,
            loss_percent: (100.0 - virgin - recycled).max(0.0),
            source: BreakdownSource::Reported,
        },
        _ => {
            let [virgin, recycled, loss] = PLACEHOLDER_FLOW;
            MaterialFlow {
                virgin_percent: virgin,
                recycled_percent: recycled,
                loss_percent: loss,
                source: BreakdownSource::Placeholder,
            }
        }
    }
}

/// The recommendation added after the service's own.
pub fn circularity_recommendation(score: f64) -> String {
    format!(
        "Circularity score is {:.1}%. Increasing recycled content raises the circular scenario's score further.",
        score
    )
}

/// Turns a raw simulation response into the comparison view model.
///
/// A response carrying a single scenario still transforms: the comparison
/// metrics that need both sides are undefined.
pub fn transform(response: &SimulationResponse) -> Result<DerivedMetrics, MetricsError> {
    let linear = response.results.linear.as_ref();
    let circular = response.results.circular.as_ref();
    if linear.is_none() && circular.is_none() {
        return Err(MetricsError::NoScenarioResults);
    }

    for (name, scenario) in [("linear", linear), ("circular", circular)] {
        match scenario {
            Some(ScenarioResult { error: Some(error), .. }) => {
                warn!(scenario = name, error = %error, "service reported a scenario error")
            }
            Some(_) => {}
            None => info!(scenario = name, "scenario not evaluated; comparison metrics are undefined"),
        }
    }

    let (co2_reduction_percent, cost_savings) = match (linear, circular) {
        (Some(linear), Some(circular)) => {
            let reduction = co2_reduction(linear.co2_total_kg, circular.co2_total_kg);
            if !reduction.is_defined() {
                warn!(linear_co2 = linear.co2_total_kg, "CO2 reduction is undefined for this baseline");
            }
            (reduction, cost_savings(linear.cost_total_usd, circular.cost_total_usd))
        }
        _ => (MetricValue::Undefined, MetricValue::Undefined),
    };

    let circularity_score =
        MetricValue::from(circular.map(|c| round_to(c.circularity.mci * 100.0, 1)));
    let mut recommendations = Vec::new();
    if !response.results.recommendation.is_empty() {
        recommendations.push(response.results.recommendation.clone());
    }
    if let Some(score) = circularity_score.value() {
        recommendations.push(circularity_recommendation(score));
    }

    Ok(DerivedMetrics {
        co2_reduction_percent,
        cost_savings,
        stage_impact: stage_series(linear, circular),
        material_flow: material_flow(circular),
        circularity_score,
        recommendations,
    })
}

/// Builds the report-service payload from a response and its derived metrics.
pub fn report_request(
    response: &SimulationResponse,
    metrics: &DerivedMetrics,
) -> Result<ReportRequest, MetricsError> {
    let linear = response
        .results
        .linear
        .clone()
        .ok_or(MetricsError::MissingScenario("linear"))?;
    let circular = response
        .results
        .circular
        .clone()
        .ok_or(MetricsError::MissingScenario("circular"))?;
    Ok(ReportRequest {
        linear,
        circular,
        recommendations: metrics.recommendations.clone(),
        stage_impact: metrics.stage_impact.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use circulca_schemas::wire::{Circularity, SimulationResults};

    fn scenario(co2: f64, cost: f64, mci: f64) -> ScenarioResult {
        ScenarioResult {
            co2_total_kg: co2,
            cost_total_usd: cost,
            circularity: Circularity {
                mci,
                recycling_rate: mci,
                loops: 0,
            },
            ..Default::default()
        }
    }

    fn response(linear: ScenarioResult, circular: ScenarioResult) -> SimulationResponse {
        SimulationResponse {
            results: SimulationResults {
                linear: Some(linear),
                circular: Some(circular),
                recommendation: "Recommended scenario: circular".to_string(),
            },
            metadata: None,
        }
    }

    #[test]
    fn co2_reduction_is_rounded_to_one_decimal() {
        assert_eq!(co2_reduction(100.0, 40.0), MetricValue::Defined(60.0));
        assert_eq!(co2_reduction(3.0, 2.0), MetricValue::Defined(33.3));
        assert_eq!(co2_reduction(10.0, 12.0), MetricValue::Defined(-20.0));
    }

    #[test]
    fn co2_reduction_against_zero_baseline_is_undefined() {
        assert_eq!(co2_reduction(0.0, 0.0), MetricValue::Undefined);
        assert_eq!(co2_reduction(0.0, 5.0), MetricValue::Undefined);
        assert_eq!(co2_reduction(f64::NAN, 5.0), MetricValue::Undefined);
    }

    #[test]
    fn cost_savings_is_rounded_to_cents_and_may_be_negative() {
        assert_eq!(cost_savings(2.50, 0.80), MetricValue::Defined(1.70));
        assert_eq!(cost_savings(1.00, 1.25), MetricValue::Defined(-0.25));
    }

    #[test]
    fn fallback_stage_split_uses_the_same_weights_for_both_scenarios() {
        let series = stage_series(Some(&scenario(100.0, 1.0, 0.0)), Some(&scenario(40.0, 1.0, 0.5)));
        assert_eq!(series.source, BreakdownSource::Estimated);
        let (linear, circular) = (series.linear.unwrap(), series.circular.unwrap());
        assert!((linear.extraction - 40.0).abs() < 1e-9);
        assert!((circular.extraction - 16.0).abs() < 1e-9);
        assert!((linear.total() - 100.0).abs() < 1e-9);
        assert!((circular.total() - 40.0).abs() < 1e-9);
        assert!((STAGE_WEIGHTS.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reported_stages_are_used_as_is() {
        let reported = StageImpact {
            extraction: 1.0,
            manufacturing: 2.0,
            transport: 3.0,
            end_of_life: 4.0,
        };
        let mut linear = scenario(10.0, 1.0, 0.0);
        linear.stage_impact = Some(reported);
        let mut circular = scenario(5.0, 1.0, 0.5);
        circular.stage_impact = Some(reported);

        let series = stage_series(Some(&linear), Some(&circular));
        assert_eq!(series.source, BreakdownSource::Reported);
        assert_eq!(series.linear, Some(reported));

        circular.stage_impact = None;
        assert_eq!(
            stage_series(Some(&linear), Some(&circular)).source,
            BreakdownSource::Estimated
        );
    }

    #[test]
    fn material_flow_falls_back_to_placeholder() {
        let flow = material_flow(Some(&scenario(1.0, 1.0, 0.3)));
        assert_eq!(flow.source, BreakdownSource::Placeholder);
        assert_eq!(
            [flow.virgin_percent, flow.recycled_percent, flow.loss_percent],
            PLACEHOLDER_FLOW
        );
        assert_eq!(material_flow(None).source, BreakdownSource::Placeholder);

        let mut reported = scenario(1.0, 1.0, 0.3);
        reported.virgin_input_percent = Some(55.0);
        reported.recycled_input_percent = Some(40.0);
        let flow = material_flow(Some(&reported));
        assert_eq!(flow.source, BreakdownSource::Reported);
        assert_eq!(flow.loss_percent, 5.0);
    }

    #[test]
    fn transform_builds_every_metric() {
        let metrics =
            transform(&response(scenario(100.0, 2.50, 0.0), scenario(40.0, 0.80, 0.625))).unwrap();
        assert_eq!(metrics.co2_reduction_percent, MetricValue::Defined(60.0));
        assert_eq!(metrics.cost_savings, MetricValue::Defined(1.70));
        assert_eq!(metrics.circularity_score, MetricValue::Defined(62.5));
        assert_eq!(metrics.recommendations.len(), 2);
        assert_eq!(metrics.recommendations[0], "Recommended scenario: circular");
        assert!(metrics.recommendations[1].contains("62.5%"));
    }

    #[test]
    fn zero_baseline_degrades_only_the_reduction_metric() {
        let metrics = transform(&response(scenario(0.0, 1.0, 0.0), scenario(0.0, 0.5, 0.2))).unwrap();
        assert_eq!(metrics.co2_reduction_percent, MetricValue::Undefined);
        assert_eq!(metrics.cost_savings, MetricValue::Defined(0.5));
        assert_eq!(metrics.recommendations.len(), 2);
    }

    #[test]
    fn linear_only_response_leaves_comparisons_undefined() {
        let mut linear_only = response(scenario(12.0, 3.0, 0.1), scenario(0.0, 0.0, 0.0));
        linear_only.results.circular = None;
        linear_only.results.recommendation = String::new();

        let metrics = transform(&linear_only).unwrap();
        assert_eq!(metrics.co2_reduction_percent, MetricValue::Undefined);
        assert_eq!(metrics.cost_savings, MetricValue::Undefined);
        assert_eq!(metrics.circularity_score, MetricValue::Undefined);
        assert!(metrics.recommendations.is_empty());
        assert_eq!(metrics.stage_impact.source, BreakdownSource::Estimated);
        assert!((metrics.stage_impact.linear.unwrap().total() - 12.0).abs() < 1e-9);
        assert_eq!(metrics.stage_impact.circular, None);
        assert_eq!(metrics.material_flow.source, BreakdownSource::Placeholder);

        assert!(matches!(
            report_request(&linear_only, &metrics),
            Err(MetricsError::MissingScenario("circular"))
        ));
    }

    #[test]
    fn circular_only_response_keeps_the_circularity_score() {
        let mut circular_only = response(scenario(0.0, 0.0, 0.0), scenario(40.0, 0.8, 0.5));
        circular_only.results.linear = None;

        let metrics = transform(&circular_only).unwrap();
        assert_eq!(metrics.co2_reduction_percent, MetricValue::Undefined);
        assert_eq!(metrics.circularity_score, MetricValue::Defined(50.0));
        assert_eq!(metrics.recommendations.len(), 2);
        assert_eq!(metrics.stage_impact.linear, None);
    }

    #[test]
    fn response_without_scenarios_is_rejected() {
        let mut empty = response(scenario(1.0, 1.0, 0.0), scenario(1.0, 1.0, 0.0));
        empty.results.linear = None;
        empty.results.circular = None;
        assert!(matches!(transform(&empty), Err(MetricsError::NoScenarioResults)));
    }

    #[test]
    fn report_request_carries_metrics() {
        let response = response(scenario(100.0, 2.5, 0.0), scenario(40.0, 0.8, 0.5));
        let metrics = transform(&response).unwrap();
        let request = report_request(&response, &metrics).unwrap();
        assert_eq!(request.recommendations, metrics.recommendations);
        assert_eq!(request.stage_impact, metrics.stage_impact);
        assert_eq!(request.linear.co2_total_kg, 100.0);
    }
}
