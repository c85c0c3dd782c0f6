//! Strict JSON schemas for the classify/normalize LLM calls (§4.6, §9).
//!
//! Every enum-typed field lists its allowed values exhaustively so the
//! endpoint's structured-output mode rejects anything outside the domain
//! vocabulary at generation time; `enum_normalize` is still mandatory
//! afterward (§9) because models drift from even a strict schema under
//! token pressure.

use serde_json::{json, Value};

pub fn classify_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "hierarchyLevel": {
                "type": "string",
                "enum": ["STRATEGY", "PLANNING", "ORDER", "EVENT_LIST"]
            },
            "documentType": { "type": "string" },
            "sourceFormat": { "type": "string" },
            "confidence": { "type": "number" },
            "title": { "type": "string" },
            "issuingAuthority": { "type": ["string", "null"] },
            "effectiveDateStr": { "type": ["string", "null"] }
        },
        "required": [
            "hierarchyLevel", "documentType", "sourceFormat", "confidence",
            "title", "issuingAuthority", "effectiveDateStr"
        ],
        "additionalProperties": false
    })
}

pub fn strategy_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "docType": { "type": "string", "enum": ["NDS", "NMS", "JSCP", "CONPLAN", "OPLAN"] },
            "authorityLevel": { "type": "string" },
            "content": { "type": "string" },
            "effectiveDateStr": { "type": ["string", "null"] },
            "priorities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "rank": { "type": "integer" },
                        "objective": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["rank", "objective", "description"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["docType", "authorityLevel", "content", "effectiveDateStr", "priorities"],
        "additionalProperties": false
    })
}

pub fn planning_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "docType": { "type": "string", "enum": ["JIPTL", "SPINS", "ACO", "MAAP", "MSEL"] },
            "content": { "type": "string" },
            "effectiveDateStr": { "type": ["string", "null"] },
            "priorities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "rank": { "type": "integer" },
                        "effect": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["rank", "effect", "description"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["docType", "content", "effectiveDateStr", "priorities"],
        "additionalProperties": false
    })
}

pub fn order_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "orderType": {
                "type": "string",
                "enum": ["ATO", "MTO", "STO", "OPORD", "EXORD", "FRAGORD", "ACO", "SPINS"]
            },
            "atoDayNumber": { "type": "integer" },
            "effectiveStartStr": { "type": "string" },
            "effectiveEndStr": { "type": "string" },
            "packages": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "packageId": { "type": "string" },
                        "priorityRank": { "type": "integer" },
                        "missionType": { "type": "string" },
                        "effectDesired": { "type": "string" },
                        "missions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "missionId": { "type": "string" },
                                    "callsign": { "type": "string" },
                                    "domain": { "type": "string", "enum": ["AIR", "MARITIME", "SPACE", "LAND"] },
                                    "platformType": { "type": "string" },
                                    "platformCount": { "type": "integer" },
                                    "missionType": { "type": "string" },
                                    "affiliation": { "type": "string", "enum": ["FRIENDLY", "HOSTILE"] },
                                    "waypoints": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "sequence": { "type": "integer" },
                                                "waypointType": { "type": "string" },
                                                "lat": { "type": "number" },
                                                "lon": { "type": "number" },
                                                "altitudeFt": { "type": ["number", "null"] },
                                                "speedKts": { "type": ["number", "null"] }
                                            },
                                            "required": ["sequence", "waypointType", "lat", "lon", "altitudeFt", "speedKts"],
                                            "additionalProperties": false
                                        }
                                    },
                                    "timeWindows": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "windowType": { "type": "string" },
                                                "startStr": { "type": "string" },
                                                "endStr": { "type": "string" }
                                            },
                                            "required": ["windowType", "startStr", "endStr"],
                                            "additionalProperties": false
                                        }
                                    },
                                    "targets": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "targetName": { "type": "string" },
                                                "lat": { "type": "number" },
                                                "lon": { "type": "number" },
                                                "targetType": { "type": "string" }
                                            },
                                            "required": ["targetName", "lat", "lon", "targetType"],
                                            "additionalProperties": false
                                        }
                                    },
                                    "supportRequirements": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "supportType": { "type": "string" },
                                                "description": { "type": "string" }
                                            },
                                            "required": ["supportType", "description"],
                                            "additionalProperties": false
                                        }
                                    },
                                    "spaceNeeds": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "capabilityType": { "type": "string" },
                                                "priority": { "type": "integer" },
                                                "startStr": { "type": "string" },
                                                "endStr": { "type": "string" },
                                                "coverageLat": { "type": ["number", "null"] },
                                                "coverageLon": { "type": ["number", "null"] },
                                                "fallbackCapability": { "type": ["string", "null"] },
                                                "missionCriticality": {
                                                    "type": "string",
                                                    "enum": ["CRITICAL", "ESSENTIAL", "ENHANCING", "ROUTINE"]
                                                }
                                            },
                                            "required": [
                                                "capabilityType", "priority", "startStr", "endStr",
                                                "coverageLat", "coverageLon", "fallbackCapability",
                                                "missionCriticality"
                                            ],
                                            "additionalProperties": false
                                        }
                                    }
                                },
                                "required": [
                                    "missionId", "callsign", "domain", "platformType", "platformCount",
                                    "missionType", "affiliation", "waypoints", "timeWindows", "targets",
                                    "supportRequirements", "spaceNeeds"
                                ],
                                "additionalProperties": false
                            }
                        }
                    },
                    "required": ["packageId", "priorityRank", "missionType", "effectDesired", "missions"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["orderType", "atoDayNumber", "effectiveStartStr", "effectiveEndStr", "packages"],
        "additionalProperties": false
    })
}

pub fn event_list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "injects": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "impact": { "type": "string" },
                        "injectType": {
                            "type": "string",
                            "enum": [
                                "FRICTION", "INTEL", "CRISIS", "SPACE", "INFORMATION",
                                "ACTION", "DECISION_POINT", "CONTINGENCY"
                            ]
                        },
                        "dtg": { "type": "string" }
                    },
                    "required": ["title", "description", "impact", "injectType", "dtg"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["injects"],
        "additionalProperties": false
    })
}
