//! Tag, attribute and record-type constants for the Apple Health export
//! document, plus the fixed column schemas of every emitted table.

/// Tags of the direct children of the `HealthData` root element.
pub const EXPORT_DATE: &str = "ExportDate";
pub const ME: &str = "Me";
pub const RECORD: &str = "Record";
pub const CORRELATION: &str = "Correlation";
pub const WORKOUT: &str = "Workout";
pub const ACTIVITY_SUMMARY: &str = "ActivitySummary";
pub const CLINICAL_RECORD: &str = "ClinicalRecord";

/// Tag of the nested key/value children of `Workout` elements.
pub const METADATA_ENTRY: &str = "MetadataEntry";

pub const FIELD_TYPE: &str = "type";
pub const FIELD_UNIT: &str = "unit";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_SOURCE_NAME: &str = "sourceName";
pub const FIELD_SOURCE_VERSION: &str = "sourceVersion";
pub const FIELD_DEVICE: &str = "device";
pub const FIELD_CREATION_DATE: &str = "creationDate";
pub const FIELD_START_DATE: &str = "startDate";
pub const FIELD_END_DATE: &str = "endDate";
pub const FIELD_DATE_COMPONENTS: &str = "dateComponents";
pub const FIELD_WORKOUT_ACTIVITY: &str = "workoutActivityType";

/// Datetime format used by every timestamp attribute in the export,
/// e.g. `2020-03-11 17:31:20 -0700`.
pub const HK_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Calendar-date format used by `dateComponents` and by date-range bounds.
pub const HK_DATE_FORMAT: &str = "%Y-%m-%d";

pub const HK_REC_TYPE_APPLE_STAND_HOUR: &str = "HKCategoryTypeIdentifierAppleStandHour";
pub const HK_REC_TYPE_AUDIO_EXPOSURE_EVENT: &str = "HKCategoryTypeIdentifierAudioExposureEvent";
pub const HK_REC_TYPE_SLEEP_ANALYSIS: &str = "HKCategoryTypeIdentifierSleepAnalysis";
pub const HK_REC_TYPE_ACTIVE_ENERGY_BURNED: &str = "HKQuantityTypeIdentifierActiveEnergyBurned";
pub const HK_REC_TYPE_APPLE_EXERCISE_TIME: &str = "HKQuantityTypeIdentifierAppleExerciseTime";
pub const HK_REC_TYPE_APPLE_STAND_TIME: &str = "HKQuantityTypeIdentifierAppleStandTime";
pub const HK_REC_TYPE_BASAL_ENERGY_BURNED: &str = "HKQuantityTypeIdentifierBasalEnergyBurned";
pub const HK_REC_TYPE_BLOOD_PRESSURE_DIASTOLIC: &str =
    "HKQuantityTypeIdentifierBloodPressureDiastolic";
pub const HK_REC_TYPE_BLOOD_PRESSURE_SYSTOLIC: &str =
    "HKQuantityTypeIdentifierBloodPressureSystolic";
pub const HK_REC_TYPE_BODY_FAT_PERCENTAGE: &str = "HKQuantityTypeIdentifierBodyFatPercentage";
pub const HK_REC_TYPE_BODY_MASS: &str = "HKQuantityTypeIdentifierBodyMass";
pub const HK_REC_TYPE_BODY_MASS_INDEX: &str = "HKQuantityTypeIdentifierBodyMassIndex";
pub const HK_REC_TYPE_DIETARY_CHOLESTEROL: &str = "HKQuantityTypeIdentifierDietaryCholesterol";
pub const HK_REC_TYPE_DISTANCE_WALKING_RUNNING: &str =
    "HKQuantityTypeIdentifierDistanceWalkingRunning";
pub const HK_REC_TYPE_ENVIRONMENTAL_AUDIO_EXPOSURE: &str =
    "HKQuantityTypeIdentifierEnvironmentalAudioExposure";
pub const HK_REC_TYPE_FLIGHTS_CLIMBED: &str = "HKQuantityTypeIdentifierFlightsClimbed";
pub const HK_REC_TYPE_HEADPHONE_AUDIO_EXPOSURE: &str =
    "HKQuantityTypeIdentifierHeadphoneAudioExposure";
pub const HK_REC_TYPE_HEART_RATE: &str = "HKQuantityTypeIdentifierHeartRate";
pub const HK_REC_TYPE_HEART_RATE_VARIABILITY_SDNN: &str =
    "HKQuantityTypeIdentifierHeartRateVariabilitySDNN";
pub const HK_REC_TYPE_HEIGHT: &str = "HKQuantityTypeIdentifierHeight";
pub const HK_REC_TYPE_LEAN_BODY_MASS: &str = "HKQuantityTypeIdentifierLeanBodyMass";
pub const HK_REC_TYPE_RESTING_HEART_RATE: &str = "HKQuantityTypeIdentifierRestingHeartRate";
pub const HK_REC_TYPE_STEP_COUNT: &str = "HKQuantityTypeIdentifierStepCount";
pub const HK_REC_TYPE_VO2MAX: &str = "HKQuantityTypeIdentifierVO2Max";
pub const HK_REC_TYPE_WAIST_CIRCUMFERENCE: &str = "HKQuantityTypeIdentifierWaistCircumference";
pub const HK_REC_TYPE_WALKING_HEART_RATE_AVERAGE: &str =
    "HKQuantityTypeIdentifierWalkingHeartRateAverage";

/// Category sample types: `value` is an enum-like string, treated as 0.0.
pub const CATEGORY_RECORD_TYPES: [&str; 3] = [
    HK_REC_TYPE_APPLE_STAND_HOUR,
    HK_REC_TYPE_AUDIO_EXPOSURE_EVENT,
    HK_REC_TYPE_SLEEP_ANALYSIS,
];

/// Quantity sample types: `value` must parse as a float.
pub const QUANTITY_RECORD_TYPES: [&str; 23] = [
    HK_REC_TYPE_ACTIVE_ENERGY_BURNED,
    HK_REC_TYPE_APPLE_EXERCISE_TIME,
    HK_REC_TYPE_APPLE_STAND_TIME,
    HK_REC_TYPE_BASAL_ENERGY_BURNED,
    HK_REC_TYPE_BLOOD_PRESSURE_DIASTOLIC,
    HK_REC_TYPE_BLOOD_PRESSURE_SYSTOLIC,
    HK_REC_TYPE_BODY_FAT_PERCENTAGE,
    HK_REC_TYPE_BODY_MASS,
    HK_REC_TYPE_BODY_MASS_INDEX,
    HK_REC_TYPE_DIETARY_CHOLESTEROL,
    HK_REC_TYPE_DISTANCE_WALKING_RUNNING,
    HK_REC_TYPE_ENVIRONMENTAL_AUDIO_EXPOSURE,
    HK_REC_TYPE_FLIGHTS_CLIMBED,
    HK_REC_TYPE_HEADPHONE_AUDIO_EXPOSURE,
    HK_REC_TYPE_HEART_RATE,
    HK_REC_TYPE_HEART_RATE_VARIABILITY_SDNN,
    HK_REC_TYPE_HEIGHT,
    HK_REC_TYPE_LEAN_BODY_MASS,
    HK_REC_TYPE_RESTING_HEART_RATE,
    HK_REC_TYPE_STEP_COUNT,
    HK_REC_TYPE_VO2MAX,
    HK_REC_TYPE_WAIST_CIRCUMFERENCE,
    HK_REC_TYPE_WALKING_HEART_RATE_AVERAGE,
];

/// Quantity types whose daily/monthly figure is a mean of the samples.
/// Point-in-time measurements average; everything else (counts, energies,
/// distances, accumulated minutes) sums.
pub const AVERAGED_RECORD_TYPES: [&str; 15] = [
    HK_REC_TYPE_BLOOD_PRESSURE_DIASTOLIC,
    HK_REC_TYPE_BLOOD_PRESSURE_SYSTOLIC,
    HK_REC_TYPE_BODY_FAT_PERCENTAGE,
    HK_REC_TYPE_BODY_MASS,
    HK_REC_TYPE_BODY_MASS_INDEX,
    HK_REC_TYPE_ENVIRONMENTAL_AUDIO_EXPOSURE,
    HK_REC_TYPE_HEADPHONE_AUDIO_EXPOSURE,
    HK_REC_TYPE_HEART_RATE,
    HK_REC_TYPE_HEART_RATE_VARIABILITY_SDNN,
    HK_REC_TYPE_HEIGHT,
    HK_REC_TYPE_LEAN_BODY_MASS,
    HK_REC_TYPE_RESTING_HEART_RATE,
    HK_REC_TYPE_VO2MAX,
    HK_REC_TYPE_WAIST_CIRCUMFERENCE,
    HK_REC_TYPE_WALKING_HEART_RATE_AVERAGE,
];

pub const WORKOUT_RUN: &str = "HKWorkoutActivityTypeRunning";
pub const WORKOUT_WALK: &str = "HKWorkoutActivityTypeWalking";

/// Whitelisted `MetadataEntry` keys flattened into workout rows, in the
/// fixed order they appear as CSV columns.
pub const WORKOUT_METADATA_KEYS: [&str; 6] = [
    "HKIndoorWorkout",
    "HKAverageMETs",
    "HKWeatherTemperature",
    "HKWeatherHumidity",
    "HKTimeZone",
    "HKElevationAscended",
];

pub fn is_category_type(record_type: &str) -> bool {
    CATEGORY_RECORD_TYPES.contains(&record_type)
}

pub fn is_quantity_type(record_type: &str) -> bool {
    QUANTITY_RECORD_TYPES.contains(&record_type)
}

pub fn is_averaged_type(record_type: &str) -> bool {
    AVERAGED_RECORD_TYPES.contains(&record_type)
}

/// Whether `record_type` is in the closed allow-list of supported samples.
pub fn is_supported_type(record_type: &str) -> bool {
    is_category_type(record_type) || is_quantity_type(record_type)
}
