//! Application services: conversion, generation, templates, archival.

pub mod archive;
pub mod convert;
pub mod error;
pub mod generate;
pub mod templates;
