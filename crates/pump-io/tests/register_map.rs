use pump_core::{BoolChannel, NumericChannel, ProcessImage, ProcessIo, SensorChannel};
use pump_io::modbus::{decode_sensor, mark_inputs_absent, publish_buttons, publish_sensors};
use pump_io::RegisterMap;

#[test]
fn default_layout_matches_station_wiring() {
    let map = RegisterMap::default();
    assert_eq!(map.sensor_register(SensorChannel::SuctionPressure), 2000);
    assert_eq!(map.sensor_register(SensorChannel::DischargePressure), 2001);
    assert_eq!(map.sensor_register(SensorChannel::FlowRate), 2002);
    assert_eq!(map.sensor_register(SensorChannel::MotorTemperature), 2003);
    assert_eq!(map.stop_coil, 2500);
    assert_eq!(map.start_coil(), 2501);
    assert_eq!(map.output_coil, 2502);
}

#[test]
fn holding_registers_scale_to_engineering_units() {
    assert_eq!(decode_sensor(SensorChannel::SuctionPressure, 16000), 50.0);
    assert_eq!(decode_sensor(SensorChannel::DischargePressure, 16000), 100.0);
    assert_eq!(decode_sensor(SensorChannel::FlowRate, 32000), 500.0);
    assert_eq!(decode_sensor(SensorChannel::MotorTemperature, 0), 50.0);
}

#[test]
fn negative_and_overrange_words_clamp() {
    // 0xFFFF is -1 as INT16.
    assert_eq!(decode_sensor(SensorChannel::FlowRate, 0xFFFF), 0.0);
    assert_eq!(decode_sensor(SensorChannel::SuctionPressure, 32767), 100.0);
}

#[test]
fn poll_results_land_in_the_image() {
    let image = ProcessImage::with_station_defaults();
    publish_sensors(&image, &[3200, 8000, 16000, 24000]).unwrap();
    publish_buttons(&image, &[false, true]).unwrap();

    assert_eq!(image.read_number(NumericChannel::SuctionPressure), Some(10.0));
    assert_eq!(image.read_number(NumericChannel::DischargePressure), Some(50.0));
    assert_eq!(image.read_number(NumericChannel::FlowRate), Some(250.0));
    assert_eq!(image.read_number(NumericChannel::MotorTemperature), Some(125.0));
    assert_eq!(image.read_bool(BoolChannel::LocalStop), Some(false));
    assert_eq!(image.read_bool(BoolChannel::LocalStart), Some(true));
}

#[test]
fn link_loss_clears_field_inputs_only() {
    let image = ProcessImage::with_station_defaults();
    publish_sensors(&image, &[3200, 8000, 16000, 24000]).unwrap();

    mark_inputs_absent(&image);

    for channel in SensorChannel::ALL {
        assert_eq!(image.read_number(channel.numeric()), None);
    }
    assert_eq!(image.read_bool(BoolChannel::LocalStop), None);
    assert_eq!(
        image.read_number(NumericChannel::TemperatureSetpoint),
        Some(145.0)
    );
    assert_eq!(image.read_bool(BoolChannel::PumpStateOutput), Some(false));
}
