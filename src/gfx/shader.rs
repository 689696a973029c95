//! WGSL sources.

/// Instanced flat-colour pass with Lambert diffuse, a soft specular and
/// ambient fill. Culling is off, so normals are flipped toward the viewer.
pub const SCENE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    view_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let view_dir = normalize(globals.view_position.xyz - in.world_position);
    var normal = normalize(in.world_normal);
    if (dot(normal, view_dir) < 0.0) {
        normal = -normal;
    }

    let light_dir = normalize(-globals.light_direction.xyz);
    let light = globals.light_color.rgb * globals.light_color.a;
    let ambient = globals.light_direction.w;

    let diffuse = max(dot(normal, light_dir), 0.0);
    let half_dir = normalize(light_dir + view_dir);
    let specular = pow(max(dot(normal, half_dir), 0.0), 32.0) * 0.35;

    let rgb = in.color.rgb * (ambient + diffuse * light) + specular * light;
    return vec4<f32>(rgb, in.color.a);
}
"#;

/// Photos and caption strips: unit quads sampling an image, multiplied by
/// the instance colour. Texture coordinates come from the quad position.
pub const TEXTURED_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    view_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var quad_texture: texture_2d<f32>;
@group(1) @binding(1)
var quad_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vec2<f32>(vertex.position.x + 0.5, 0.5 - vertex.position.y);
    out.color = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(quad_texture, quad_sampler, in.uv) * in.color;
    if (texel.a < 0.01) {
        discard;
    }

    let view_dir = normalize(globals.view_position.xyz - in.world_position);
    var normal = normalize(in.world_normal);
    if (dot(normal, view_dir) < 0.0) {
        normal = -normal;
    }
    let light_dir = normalize(-globals.light_direction.xyz);
    let diffuse = max(dot(normal, light_dir), 0.0) * globals.light_color.a;

    // Pictures stay close to their own colours.
    let shade = min(0.8 + 0.2 * diffuse, 1.0);
    return vec4<f32>(texel.rgb * shade, texel.a);
}
"#;
