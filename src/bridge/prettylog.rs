use crate::bridge::config::Config;

pub fn log_startup_banner(config: &Config, simulate: bool) {
    println!("====================================");
    println!("  Agrosense Sensor Bridge Starting");
    println!("====================================");
    if simulate {
        println!("Serial port: disabled (simulation)");
    } else {
        println!("Serial port: {} @ {} baud", config.serial.port, config.serial.baud_rate);
    }
    println!("HTTP API: http://{}/api/v1/sensors", config.http.listen_addr);
    println!("Model: {}", config.advisor.model);
    if !config.advisor.has_api_key() {
        println!("API key: missing, /api/v1/ai_response will fail");
    }
    println!("------------------------------------");
}
