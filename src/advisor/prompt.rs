//! Prompt construction for the recommendation model

use crate::sensor::SensorReading;

pub const SYSTEM_PROMPT: &str = "You are an expert agronomist and horticulture consultant. \
Your task is to analyze the provided environmental conditions and suggest 3-5 suitable plants \
that will thrive with minimal environmental adjustment. Respond ONLY with a JSON array that \
strictly adheres to the provided schema. Do not include any other text, markdown, or explanation.";

const CRITERIA: &str = "Criteria for Suggestion:
The suggested plants must maximize the probability of successful growth, requiring minimal \
adjustment to the existing conditions. Focus on plants that thrive within the *measured* ranges, \
not just tolerate them. The suggestions should be practical and commonly available.";

const OUTPUT_FORMAT: &str = r#"Output Format:
A list of 3 to 5 plants suitable for the given conditions.
required: ["rank", "suggestedPlantName", "keyEnvironmentalNeeds", "rationaleForSuitability"]
Example:
[
    {
        "rank": 1,
        "suggestedPlantName": "Tomato",
        "keyEnvironmentalNeeds": {
            "temperatureRange": "20-25°C",
            "humidityRange": "50-70%",
            "soilType": "Loamy",
            "soilPHRange": "6.0-6.8",
            "rainfall": "Moderate"
        },
        "rationaleForSuitability": "Tomatoes thrive in warm temperatures and moderate humidity, which align well with the provided conditions. The loamy soil type and slightly acidic pH are ideal for nutrient uptake."
    },
    {
        "rank": 2,
        "suggestedPlantName": "Basil",
        "keyEnvironmentalNeeds": {
            "temperatureRange": "18-30°C",
            "humidityRange": "40-60%",
            "soilType": "Well-drained",
            "soilPHRange": "5.5-6.5",
            "rainfall": "Light to Moderate"
        },
        "rationaleForSuitability": "Basil prefers warm climates and can tolerate a range of humidity levels. The well-drained soil and slightly acidic pH make it a good match for the current environment."
    }
]"#;

/// User turn listing the reading and the expected answer format
pub fn user_prompt(reading: &SensorReading) -> String {
    format!(
        "Analyze the following sensor and contextual data to suggest the best suitable plants:
- Temperature: {} °C
- Humidity: {} %
- Soil Moisture: {}
- Soil Type: {}
- Soil pH: {}
- Rainfall: {}
- Season: {}

{}

{}",
        reading.temperature,
        reading.humidity,
        reading.moisture,
        reading.soil_type,
        reading.soil_ph,
        reading.rainfall,
        reading.season,
        CRITERIA,
        OUTPUT_FORMAT,
    )
}
