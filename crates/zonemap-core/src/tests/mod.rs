mod engine;
mod refresh;
