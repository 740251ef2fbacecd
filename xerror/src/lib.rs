pub mod zap_engine;
